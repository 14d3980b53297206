use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::PREFER_REPRESENTATION;
use shared_database::{tables, PostgrestQuery, SupabaseClient, SupabaseError};

use crate::models::{
    CascadeSummary, CreateDentistRequest, Dentist, DentistError, UpdateDentistRequest,
};
use crate::services::query::DentistListParams;

pub struct DentistService {
    supabase: SupabaseClient,
}

/// Constraint violations carry the storage validation detail back to the client.
fn write_error(err: SupabaseError) -> DentistError {
    match err {
        SupabaseError::Constraint(detail) => DentistError::Validation(detail),
        other => DentistError::Database(other),
    }
}

fn first_row(rows: Vec<Value>, id: Uuid) -> Result<Dentist, DentistError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| DentistError::NotFound(id.to_string()))?;
    Ok(serde_json::from_value(row).map_err(SupabaseError::from)?)
}

impl DentistService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Filtered, sorted page of dentists plus the total matching the filters.
    /// Rows stay untyped because `select` may project any subset of columns.
    pub async fn list_dentists(
        &self,
        params: &DentistListParams,
    ) -> Result<(Vec<Value>, u64), DentistError> {
        let query = params.to_query();
        debug!("Listing dentists with query: {:?}", query);

        let total = self.supabase.count(tables::DENTISTS, &query, None).await?;
        let rows: Vec<Value> = self
            .supabase
            .query(Method::GET, tables::DENTISTS, &query, None, None, None)
            .await?;

        Ok((rows, total))
    }

    pub async fn get_dentist(
        &self,
        dentist_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Dentist, DentistError> {
        debug!("Fetching dentist: {}", dentist_id);

        let query = PostgrestQuery::new().eq("id", dentist_id);
        let rows: Vec<Value> = self
            .supabase
            .query(Method::GET, tables::DENTISTS, &query, auth_token, None, None)
            .await?;

        first_row(rows, dentist_id)
    }

    pub async fn create_dentist(
        &self,
        request: CreateDentistRequest,
        auth_token: &str,
    ) -> Result<Dentist, DentistError> {
        request.validate()?;
        debug!("Creating dentist: {}", request.name.trim());

        let dentist_data = json!({
            "name": request.name.trim(),
            "hospital": request.hospital,
            "address": request.address,
            "expertise": request.expertise,
            "tel": request.tel,
            "picture": request.picture,
        });

        let rows: Vec<Value> = self
            .supabase
            .query(
                Method::POST,
                tables::DENTISTS,
                &PostgrestQuery::new(),
                Some(auth_token),
                Some(dentist_data),
                Some(PREFER_REPRESENTATION),
            )
            .await
            .map_err(write_error)?;

        let dentist = rows
            .into_iter()
            .next()
            .ok_or_else(|| DentistError::Validation("Dentist was not created".to_string()))?;
        let dentist: Dentist = serde_json::from_value(dentist).map_err(SupabaseError::from)?;

        info!("Dentist created with ID: {}", dentist.id);
        Ok(dentist)
    }

    pub async fn update_dentist(
        &self,
        dentist_id: Uuid,
        request: UpdateDentistRequest,
        auth_token: &str,
    ) -> Result<Dentist, DentistError> {
        request.validate()?;

        if request.is_empty() {
            return self.get_dentist(dentist_id, Some(auth_token)).await;
        }

        let mut update_data = Map::new();
        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(hospital) = request.hospital {
            update_data.insert("hospital".to_string(), json!(hospital));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(expertise) = request.expertise {
            update_data.insert("expertise".to_string(), json!(expertise));
        }
        if let Some(tel) = request.tel {
            update_data.insert("tel".to_string(), json!(tel));
        }
        if let Some(picture) = request.picture {
            update_data.insert("picture".to_string(), json!(picture));
        }

        debug!("Updating dentist {} fields: {:?}", dentist_id, update_data.keys());

        let rows: Vec<Value> = self
            .supabase
            .query(
                Method::PATCH,
                tables::DENTISTS,
                &PostgrestQuery::new().eq("id", dentist_id),
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(PREFER_REPRESENTATION),
            )
            .await
            .map_err(write_error)?;

        first_row(rows, dentist_id)
    }

    /// Removes the dentist's bookings, then the dentist. The order keeps the
    /// "no booking references a missing dentist" invariant if the second step fails.
    pub async fn delete_dentist(
        &self,
        dentist_id: Uuid,
        auth_token: &str,
    ) -> Result<CascadeSummary, DentistError> {
        self.get_dentist(dentist_id, Some(auth_token)).await?;

        info!("Bookings being removed from dentist {}", dentist_id);
        let removed: Vec<Value> = self
            .supabase
            .query(
                Method::DELETE,
                tables::BOOKINGS,
                &PostgrestQuery::new().eq("dentist_id", dentist_id),
                Some(auth_token),
                None,
                Some(PREFER_REPRESENTATION),
            )
            .await?;

        self.supabase
            .execute(
                Method::DELETE,
                tables::DENTISTS,
                &PostgrestQuery::new().eq("id", dentist_id),
                Some(auth_token),
                None,
            )
            .await?;

        Ok(CascadeSummary {
            dentist_id,
            bookings_removed: removed.len(),
        })
    }
}
