//! API route definitions.

use std::future::Future;
use std::time::Duration;

use axum::{Router, middleware};
use tally_core::BudgetError;
use tally_shared::AppError;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::warn;

use crate::{AppState, error::ApiError, middleware::auth::auth_middleware};

pub mod accounts;
pub mod bills;
pub mod budgets;
pub mod categories;
pub mod health;
pub mod statistics;
pub mod transactions;

/// Creates the API router; everything but health requires a bearer token.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(budgets::routes())
        .merge(statistics::routes())
        .merge(accounts::routes())
        .merge(categories::routes())
        .merge(transactions::routes())
        .merge(bills::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

/// A token that fires when the returned guard is dropped.
pub(crate) fn request_cancellation() -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

/// Runs a read-only aggregation on its own task.
///
/// The handler keeps the drop guard while it awaits the task, so a client
/// disconnect or the outer request timeout cancels the token. Past
/// `deadline` the token is fired here as well and the task's
/// `Cancelled` answer is returned to the client.
pub(crate) async fn run_cancellable<T, W, F>(deadline: Duration, work: W) -> Result<T, ApiError>
where
    W: FnOnce(CancellationToken) -> F,
    F: Future<Output = Result<T, BudgetError>> + Send + 'static,
    T: Send + 'static,
{
    let (cancel, _guard) = request_cancellation();
    let mut task = tokio::spawn(work(cancel.clone()));

    let joined = tokio::select! {
        joined = &mut task => joined,
        () = tokio::time::sleep(deadline) => {
            warn!(deadline_ms = deadline.as_millis(), "aggregation deadline reached, cancelling");
            cancel.cancel();
            (&mut task).await
        }
    };

    match joined {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(AppError::Internal(format!("aggregation task failed: {e}")).into()),
    }
}
