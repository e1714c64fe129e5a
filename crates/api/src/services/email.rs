//! Transactional email.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Every message is
//! sent as `multipart/alternative` with a plain text and an HTML part.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use marketplace_core::SellerStatus;

use crate::config::EmailConfig;
use crate::models::order::Order;

/// One row of the order table in the confirmation email.
struct EmailLine<'a> {
    name: &'a str,
    quantity: i32,
    price: Decimal,
}

#[derive(Template)]
#[template(path = "email/order_placed.html")]
struct OrderPlacedHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    lines: &'a [EmailLine<'a>],
    total: Decimal,
    payment_method: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_placed.txt")]
struct OrderPlacedText<'a> {
    name: &'a str,
    order_number: &'a str,
    lines: &'a [EmailLine<'a>],
    total: Decimal,
    payment_method: &'a str,
}

#[derive(Template)]
#[template(path = "email/payment_confirmed.html")]
struct PaymentConfirmedHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    total: Decimal,
}

#[derive(Template)]
#[template(path = "email/payment_confirmed.txt")]
struct PaymentConfirmedText<'a> {
    name: &'a str,
    order_number: &'a str,
    total: Decimal,
}

#[derive(Template)]
#[template(path = "email/seller_status.html")]
struct SellerStatusHtml<'a> {
    name: &'a str,
    status: &'a str,
    active: bool,
}

#[derive(Template)]
#[template(path = "email/seller_status.txt")]
struct SellerStatusText<'a> {
    name: &'a str,
    status: &'a str,
    active: bool,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the order confirmation to the customer.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_placed(
        &self,
        to: &str,
        name: &str,
        order: &Order,
    ) -> Result<(), EmailError> {
        let lines: Vec<EmailLine<'_>> = order
            .items
            .iter()
            .map(|item| EmailLine {
                name: &item.product_name,
                quantity: item.quantity,
                price: item.price,
            })
            .collect();

        let html = OrderPlacedHtml {
            name,
            order_number: &order.order_number,
            lines: &lines,
            total: order.total_price,
            payment_method: &order.payment_method,
        }
        .render()?;
        let text = OrderPlacedText {
            name,
            order_number: &order.order_number,
            lines: &lines,
            total: order.total_price,
            payment_method: &order.payment_method,
        }
        .render()?;

        let subject = format!("Order {} received", order.order_number);
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Tell the customer their payment was verified.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_payment_confirmed(
        &self,
        to: &str,
        name: &str,
        order: &Order,
    ) -> Result<(), EmailError> {
        let html = PaymentConfirmedHtml {
            name,
            order_number: &order.order_number,
            total: order.total_price,
        }
        .render()?;
        let text = PaymentConfirmedText {
            name,
            order_number: &order.order_number,
            total: order.total_price,
        }
        .render()?;

        let subject = format!("Payment confirmed for {}", order.order_number);
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Tell a seller their account status changed.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_seller_status(
        &self,
        to: &str,
        name: &str,
        status: SellerStatus,
        active: bool,
    ) -> Result<(), EmailError> {
        let status = status.as_str();
        let html = SellerStatusHtml {
            name,
            status,
            active,
        }
        .render()?;
        let text = SellerStatusText {
            name,
            status,
            active,
        }
        .render()?;

        self.send_multipart_email(to, "Your seller account was updated", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_placed_text_lists_lines() {
        let lines = [
            EmailLine {
                name: "Mug",
                quantity: 2,
                price: Decimal::new(1250, 2),
            },
            EmailLine {
                name: "Tee",
                quantity: 1,
                price: Decimal::new(2000, 2),
            },
        ];
        let text = OrderPlacedText {
            name: "Ada",
            order_number: "ORD-20260101120000-ABC123",
            lines: &lines,
            total: Decimal::new(4500, 2),
            payment_method: "mobile_money",
        }
        .render()
        .unwrap();

        assert!(text.contains("ORD-20260101120000-ABC123"));
        assert!(text.contains("Mug x2 @ 12.50"));
        assert!(text.contains("Total: 45.00"));
    }

    #[test]
    fn test_seller_status_html_reflects_visibility() {
        let hidden = SellerStatusHtml {
            name: "Bo",
            status: "SUSPENDED",
            active: false,
        }
        .render()
        .unwrap();
        assert!(hidden.contains("SUSPENDED"));
        assert!(hidden.contains("hidden from the marketplace"));
    }
}
