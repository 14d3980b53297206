use std::sync::Arc;

use reqwest::Method;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use dentist_cell::models::Dentist;
use dentist_cell::services::DentistService;
use shared_config::{AppConfig, MailConfig};
use shared_database::{tables, PostgrestQuery, SupabaseClient};
use shared_models::auth::UserProfile;

use crate::models::{BookingNotice, DispatchOutcome, MailMessage, NotificationError};
use crate::services::mailer::{HttpMailTransport, MailTransport};

const PROFILE_COLUMNS: &str = "id,name,email,tel,role";

/// Sends booking confirmations. Injected once at startup.
pub struct NotificationService {
    supabase: SupabaseClient,
    dentists: DentistService,
    transport: Arc<dyn MailTransport>,
    mail: MailConfig,
}

pub fn compose_confirmation(
    from: &str,
    recipient: &UserProfile,
    dentist: &Dentist,
    notice: &BookingNotice,
) -> MailMessage {
    let contact_line = match &dentist.tel {
        Some(tel) if !tel.is_empty() => format!("{}, {}", dentist.address, tel),
        _ => dentist.address.clone(),
    };

    let text = format!(
        "Dear {name},\n\n\
         Thank you for booking with us. We are pleased to confirm your booking for the following details:\n\
         \x20   Booking ID: {booking_id}\n\
         \x20   Dentist: {dentist}\n\
         \x20   Expertise: {expertise}\n\
         \x20   Dentist Address: {contact}\n\
         \x20   Hospital: {hospital}\n\
         \x20   Booking Date: {date}\n\n\
         Please review the details above to ensure that everything is accurate. \
         If you notice any discrepancies, please contact us at {from}.\n\n\
         Sincerely,\n",
        name = recipient.name,
        booking_id = notice.booking_id,
        dentist = dentist.name,
        expertise = dentist.expertise,
        contact = contact_line,
        hospital = dentist.hospital,
        date = notice.booking_date.format("%d/%m/%Y"),
        from = from,
    );

    MailMessage {
        from: from.to_string(),
        to: recipient.email.clone(),
        subject: format!("Your Booking Confirmation - {}", notice.booking_id),
        text,
    }
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        let transport = Arc::new(HttpMailTransport::new(config.mail.clone()));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: &AppConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            dentists: DentistService::new(config),
            transport,
            mail: config.mail.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mail.is_configured()
    }

    async fn find_recipient(
        &self,
        user_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<UserProfile>, NotificationError> {
        let query = PostgrestQuery::new().eq("id", user_id).select(PROFILE_COLUMNS);
        let profiles: Vec<UserProfile> = self
            .supabase
            .query(Method::GET, tables::PROFILES, &query, auth_token, None, None)
            .await?;

        Ok(profiles.into_iter().next())
    }

    pub async fn send_booking_confirmation(
        &self,
        notice: &BookingNotice,
        auth_token: Option<&str>,
    ) -> Result<DispatchOutcome, NotificationError> {
        if !self.is_enabled() {
            warn!("Mail transport not configured, skipping confirmation for booking {}", notice.booking_id);
            return Ok(DispatchOutcome::NotConfigured);
        }

        let Some(recipient) = self.find_recipient(notice.user_id, auth_token).await? else {
            debug!("No profile for user {}, skipping confirmation", notice.user_id);
            return Ok(DispatchOutcome::NoRecipient);
        };

        let dentist = self.dentists.get_dentist(notice.dentist_id, auth_token).await?;
        let message = compose_confirmation(&self.mail.from_address, &recipient, &dentist, notice);

        self.transport.send(&message).await?;
        info!("Booking confirmation {} sent to {}", notice.booking_id, recipient.email);

        Ok(DispatchOutcome::Sent)
    }

    /// Sends the confirmation on a detached task. Failures are logged and
    /// never reach the caller; the handle exists only for observation.
    pub fn dispatch(self: &Arc<Self>, notice: BookingNotice, auth_token: Option<String>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service
                .send_booking_confirmation(&notice, auth_token.as_deref())
                .await
            {
                error!("Failed to send confirmation for booking {}: {}", notice.booking_id, e);
            }
        })
    }
}
