use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::Message;
use opsdigest_workbook::{Artifact, XLSX_MIME};
use tracing::debug;

use super::{Delivery, DeliveryFuture, NotificationChannel, ReportDigest};
use crate::error::ReportError;
use crate::mail::{MailError, MailSettings, Mailer};

const CHANNEL: &str = "email";

/// HTML summary with the spreadsheet attached.
#[derive(Clone)]
pub struct EmailChannel {
    mailer: Arc<dyn Mailer>,
    settings: MailSettings,
}

impl EmailChannel {
    pub fn new(mailer: Arc<dyn Mailer>, settings: MailSettings) -> Self {
        Self { mailer, settings }
    }

    fn build_message(&self, digest: &ReportDigest, artifact: &Artifact) -> Result<Message, ReportError> {
        let bytes = artifact
            .read_bytes()
            .map_err(|error| ReportError::channel(CHANNEL, error.to_string()))?;
        let content_type = ContentType::parse(XLSX_MIME)
            .map_err(|error| ReportError::channel(CHANNEL, error.to_string()))?;

        Message::builder()
            .from(self.settings.sender().map_err(mail_failure)?)
            .to(self.settings.recipient().map_err(mail_failure)?)
            .subject(digest.email_subject())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(digest.email_html()))
                    .singlepart(Attachment::new(artifact.file_name.clone()).body(bytes, content_type)),
            )
            .map_err(|error| mail_failure(MailError::Build(error.to_string())))
    }
}

fn mail_failure(error: MailError) -> ReportError {
    ReportError::channel(CHANNEL, error.to_string())
}

impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    fn display_name(&self) -> &'static str {
        "E-mail"
    }

    fn deliver<'a>(&'a self, digest: &'a ReportDigest, artifact: &'a Artifact) -> DeliveryFuture<'a> {
        Box::pin(async move {
            let message = self.build_message(digest, artifact)?;
            debug!(
                recipient = self.settings.recipient_address(),
                attachment = %artifact.file_name,
                "sending report mail"
            );
            self.mailer.send(message).await.map_err(mail_failure)?;
            Ok(Delivery::Sent)
        })
    }
}
