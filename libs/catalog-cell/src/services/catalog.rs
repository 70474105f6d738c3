// libs/catalog-cell/src/services/catalog.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CatalogError, CreateServiceRequest, Service, UpdateServiceRequest};

const SERVICIOS: &str = "/rest/v1/servicios";

/// CRUD over the service catalog. Reads are public; writes come through the
/// admin handlers only.
pub struct CatalogService {
    supabase: Arc<SupabaseClient>,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Catalog listing, grouped for display: category first, then name.
    /// `categoria` narrows to one category when given.
    pub async fn list_services(
        &self,
        categoria: Option<&str>,
    ) -> Result<Vec<Service>, CatalogError> {
        let path = match categoria {
            Some(categoria) => format!(
                "{}?categoria=eq.{}&order=categoria.asc,nombre.asc",
                SERVICIOS,
                urlencoding::encode(categoria)
            ),
            None => format!("{}?order=categoria.asc,nombre.asc", SERVICIOS),
        };

        debug!("Listing catalog services (categoria filter: {:?})", categoria);
        self.request(Method::GET, &path, None, None).await
    }

    pub async fn get_service(&self, id: Uuid) -> Result<Service, CatalogError> {
        let path = format!("{}?id=eq.{}", SERVICIOS, id);
        let servicios: Vec<Service> = self.request(Method::GET, &path, None, None).await?;

        servicios.into_iter().next().ok_or(CatalogError::NotFound)
    }

    pub async fn create_service(
        &self,
        request: CreateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, CatalogError> {
        validate_service_fields(
            &request.categoria,
            &request.nombre,
            request.duracion,
            request.precio,
        )?;

        let record = json!({
            "categoria": request.categoria,
            "nombre": request.nombre,
            "duracion": request.duracion,
            "precio": request.precio,
        });

        let servicios: Vec<Service> = self
            .request(Method::POST, SERVICIOS, Some(auth_token), Some(record))
            .await?;

        let servicio = servicios.into_iter().next().ok_or_else(|| {
            CatalogError::DatabaseError("insert returned no rows".to_string())
        })?;

        info!("Service {} created ({} / {})", servicio.id, servicio.categoria, servicio.nombre);
        Ok(servicio)
    }

    pub async fn update_service(
        &self,
        id: Uuid,
        request: UpdateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, CatalogError> {
        let current = self.get_service(id).await?;

        let categoria = request.categoria.unwrap_or(current.categoria);
        let nombre = request.nombre.unwrap_or(current.nombre);
        let duracion = request.duracion.unwrap_or(current.duracion);
        let precio = request.precio.unwrap_or(current.precio);

        validate_service_fields(&categoria, &nombre, duracion, precio)?;

        let patch = json!({
            "categoria": categoria,
            "nombre": nombre,
            "duracion": duracion,
            "precio": precio,
        });

        let path = format!("{}?id=eq.{}", SERVICIOS, id);
        let servicios: Vec<Service> = self
            .request(Method::PATCH, &path, Some(auth_token), Some(patch))
            .await?;

        let servicio = servicios.into_iter().next().ok_or(CatalogError::NotFound)?;
        info!("Service {} updated", servicio.id);
        Ok(servicio)
    }

    pub async fn delete_service(&self, id: Uuid, auth_token: &str) -> Result<(), CatalogError> {
        let path = format!("{}?id=eq.{}", SERVICIOS, id);
        let deleted: Vec<Value> = self
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        if deleted.is_empty() {
            return Err(CatalogError::NotFound);
        }

        info!("Service {} deleted", id);
        Ok(())
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, CatalogError> {
        self.supabase
            .request(method, path, auth_token, body)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))
    }
}

fn validate_service_fields(
    categoria: &str,
    nombre: &str,
    duracion: i32,
    precio: f64,
) -> Result<(), CatalogError> {
    let mut errores = Vec::new();

    if categoria.trim().is_empty() {
        errores.push("La categoría es obligatoria".to_string());
    }
    if nombre.trim().is_empty() {
        errores.push("El nombre del servicio es obligatorio".to_string());
    }
    if duracion <= 0 {
        errores.push("La duración debe ser un número positivo de minutos".to_string());
    }
    if precio <= 0.0 {
        errores.push("El precio debe ser un número positivo".to_string());
    }

    if errores.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Validation(errores))
    }
}
