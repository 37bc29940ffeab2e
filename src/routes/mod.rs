use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, auth, flights, notifications, tickets, users};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let public_routes = Router::new()
        .route("/flights", get(flights::list_flights))
        .route("/flights/search", get(flights::search_flights))
        .route("/flights/{id}", get(flights::get_flight));

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        // Flight management
        .route("/flights", post(admin::create_flight))
        .route("/flights/{id}", put(admin::update_flight))
        .route("/flights/{id}", delete(admin::delete_flight))
        // User management
        .route("/users", get(admin::list_users))
        .route("/users/{id}", get(admin::get_user))
        .route("/users/{id}", delete(admin::delete_user))
        // Ticket oversight
        .route("/tickets/user/{id}", get(admin::tickets_by_user))
        .route("/tickets/flight/{id}", get(admin::tickets_by_flight))
        .route("/tickets/purchased", get(admin::tickets_by_purchase_range))
        .route("/tickets/{id}", put(tickets::update_ticket))
        // Notification oversight
        .route(
            "/notifications/type/{type}",
            get(admin::notifications_by_type),
        )
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Ticket routes (requires auth)
    let ticket_routes = Router::new()
        .route("/", post(tickets::create_ticket))
        .route("/my-tickets", get(tickets::my_tickets))
        .route("/number/{ticket_number}", get(tickets::get_by_number))
        .route("/status/{status}", get(tickets::my_tickets_by_status))
        .route("/{id}", get(tickets::get_ticket))
        .route("/{id}/confirm", post(tickets::confirm_ticket))
        .route("/{id}/cancel", post(tickets::cancel_ticket))
        .route("/{id}/pdf", get(tickets::ticket_pdf))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Notification routes (requires auth)
    let notification_routes = Router::new()
        .route("/", get(notifications::my_notifications))
        .route("/unseen", get(notifications::unseen_notifications))
        .route("/range", get(notifications::notifications_in_range))
        .route("/{id}/mark-seen", post(notifications::mark_seen))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Profile routes (requires auth)
    let user_routes = Router::new()
        .route("/me", get(users::me))
        .route("/me", put(users::update_me))
        .route("/me/password", put(users::change_password))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/tickets", ticket_routes)
        .nest("/api/notifications", notification_routes)
        .nest("/api/users", user_routes)
        .with_state(state)
}
