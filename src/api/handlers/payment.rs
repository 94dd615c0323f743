use axum::{extract::{Path, State}, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{CreateInvoiceRequest, CreatePaymentRequest, PaginationQuery, UpdatePaymentStatusRequest};
use crate::api::dtos::responses::{created, ok, ok_with_message};
use crate::api::extractors::{auth::AuthUser, role::RequireAdmin};
use crate::api::validation::{ValidatedJson, ValidatedQuery};
use crate::domain::models::{
    analytics::{AnalyticsEvent, EventType},
    audit::AuditLog,
    payment::{Invoice, Payment},
};
use crate::domain::services::base_service::ResourceKind;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_DUE_DAYS: i64 = 30;

fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let payments = state.repos.payments.list_by_user(auth.id(), query.limit(), query.offset()).await?;
    Ok(ok(payments))
}

/// Records a payment intent. Charging happens at the provider, out of band.
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut payment = Payment::new(
        auth.tenant_id().to_string(),
        auth.id().to_string(),
        to_cents(payload.amount),
        payload.currency,
        payload.provider,
    );
    payment.description = payload.description;

    let payment = state.base_service.execute_with_logging(
        "create_payment",
        auth.id(),
        state.repos.payments.create(&payment),
    ).await?;

    state.base_service.audit_log(
        AuditLog::new(auth.id(), "PAYMENT_CREATED", "payment")
            .tenant(auth.tenant_id())
            .resource_id(&payment.id)
            .details(json!({
                "amountCents": payment.amount_cents,
                "currency": payment.currency,
                "provider": payment.provider,
                "webhookUrl": payload.webhook_url,
            })),
    ).await;
    state.base_service.track_analytics(
        AnalyticsEvent::new(EventType::PaymentCreated, "payment", &payment.id)
            .by(auth.id(), auth.tenant_id())
            .data(json!({ "amountCents": payment.amount_cents, "currency": payment.currency })),
    ).await;

    Ok(created(payment, "Payment created successfully"))
}

pub async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdatePaymentStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let auth = &admin.0;
    let payment = state.repos.payments.find_in_tenant(&id, auth.tenant_id()).await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    let status = payload.status;
    let updated = state.repos.payments.update_status(&payment.id, &status).await?;

    state.base_service.audit_log(
        AuditLog::new(auth.id(), "PAYMENT_STATUS_UPDATED", "payment")
            .tenant(auth.tenant_id())
            .resource_id(&updated.id)
            .details(json!({ "from": payment.status, "to": status, "externalId": payload.external_id })),
    ).await;
    if status == "COMPLETED" && payment.status != "COMPLETED" {
        state.base_service.track_analytics(
            AnalyticsEvent::new(EventType::PaymentCompleted, "payment", &updated.id)
                .by(&updated.user_id, &updated.tenant_id)
                .data(json!({ "amountCents": updated.amount_cents, "currency": updated.currency })),
        ).await;
    }

    info!(payment_id = %updated.id, status = %status, "Payment status updated");
    Ok(ok_with_message(updated, "Payment status updated successfully"))
}

pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let invoices = state.repos.payments.list_invoices_by_user(auth.id()).await?;
    Ok(ok(invoices))
}

pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(payment_id) = payload.payment_id.as_deref()
        && !state.base_service.check_resource_ownership(ResourceKind::Payment, payment_id, auth.id()).await? {
        return Err(AppError::NotFound("Payment not found".to_string()));
    }

    let mut invoice = Invoice::new(
        auth.tenant_id().to_string(),
        auth.id().to_string(),
        to_cents(payload.amount),
        payload.currency,
        payload.due_in_days.unwrap_or(DEFAULT_DUE_DAYS),
    );
    invoice.payment_id = payload.payment_id;
    if let Some(status) = payload.status {
        invoice.status = status;
    }

    let invoice = state.repos.payments.create_invoice(&invoice).await?;
    state.base_service.audit_log(
        AuditLog::new(auth.id(), "INVOICE_CREATED", "invoice")
            .tenant(auth.tenant_id())
            .resource_id(&invoice.id)
            .details(json!({ "number": invoice.number })),
    ).await;

    Ok(created(invoice, "Invoice created successfully"))
}
