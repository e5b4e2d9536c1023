/// Activity auditing for HTTP handlers
///
/// Handlers wrap successful results in [`Audited`], which parks an
/// [`AuditEntry`] in the response extensions. The [`record_activity`]
/// middleware picks it up after the handler (and any transaction it ran)
/// has finished, and writes it through the [`AuditLogger`].
///
/// Error responses never carry an entry, so failed requests are never
/// audited. When the sink fails the response is left intact and an
/// `x-audit-warning` header tells the client the entry is missing.
///
/// # Example
///
/// ```no_run
/// use axum::Json;
/// use taskify_api::audit::Audited;
/// use taskify_shared::audit::{actions, AuditEntry};
/// use taskify_shared::models::EntityKind;
/// use uuid::Uuid;
///
/// async fn handler(id: Uuid) -> Audited<Json<Uuid>> {
///     Audited::new(AuditEntry::new(EntityKind::Task, id, actions::VIEWED), Json(id))
/// }
/// ```

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use taskify_shared::audit::{AuditEntry, AuditLogger, AuditOutcome};
use taskify_shared::auth::middleware::AuthContext;

/// Header set when the activity entry for a successful request was lost
pub const AUDIT_WARNING_HEADER: &str = "x-audit-warning";

/// Entry waiting in response extensions for the middleware
#[derive(Debug, Clone)]
struct PendingAudit(AuditEntry);

/// A response together with the activity entry it should produce
#[derive(Debug)]
pub struct Audited<R> {
    entry: AuditEntry,
    response: R,
}

impl<R> Audited<R> {
    pub fn new(entry: AuditEntry, response: R) -> Self {
        Self { entry, response }
    }
}

impl<R: IntoResponse> IntoResponse for Audited<R> {
    fn into_response(self) -> Response {
        let mut response = self.response.into_response();
        response.extensions_mut().insert(PendingAudit(self.entry));
        response
    }
}

/// Records the entry attached by an [`Audited`] handler result
///
/// The caller is read from the request before the handler runs, so this
/// layer must sit inside the JWT layer on protected routes.
pub async fn record_activity(
    State(audit): State<AuditLogger>,
    req: Request,
    next: Next,
) -> Response {
    let caller = req.extensions().get::<AuthContext>().map(|ctx| ctx.user_id);

    let mut response = next.run(req).await;

    let Some(PendingAudit(entry)) = response.extensions_mut().remove::<PendingAudit>() else {
        return response;
    };
    if !response.status().is_success() {
        return response;
    }

    if let AuditOutcome::Failed(message) = audit.record(entry, caller).await {
        if let Ok(value) = HeaderValue::from_str(&message) {
            response.headers_mut().insert(AUDIT_WARNING_HEADER, value);
        }
    }

    response
}
