use crate::{
    api::{attendance, cards, leave, leave_type, users, work_group},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter config
    fn build_limiter(requests_per_min: u32) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap()
    }

    let login_limiter = build_limiter(config.rate_login_per_min);
    let register_limiter = build_limiter(config.rate_register_per_min);
    let refresh_limiter = build_limiter(config.rate_refresh_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);
    let device_limiter = build_limiter(config.rate_device_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&login_limiter))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(Governor::new(&register_limiter))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&refresh_limiter))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&login_limiter))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(Governor::new(&protected_limiter)) // rate limiting
            .service(handlers::protected)
            .service(
                web::scope("/users")
                    // /users
                    .service(web::resource("").route(web::get().to(users::list_users)))
                    // /users/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(users::update_user))
                            .route(web::get().to(users::get_user))
                            .route(web::delete().to(users::deactivate_user)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave/balance
                    .service(
                        web::resource("/balance").route(web::get().to(leave::leave_balance)),
                    )
                    // /leave/quota
                    .service(web::resource("/quota").route(web::get().to(leave::leave_quota)))
                    // /leave/history
                    .service(
                        web::resource("/history").route(web::get().to(leave::leave_history)),
                    )
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::leave_list))
                            .route(web::post().to(leave::create_leave)),
                    )
                    // /leave/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave::get_leave))
                            .route(web::delete().to(leave::cancel_leave)),
                    )
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(leave::reject_leave)),
                    ),
            )
            .service(
                web::scope("/leave-types")
                    // /leave-types
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_type::list_leave_types))
                            .route(web::post().to(leave_type::create_leave_type)),
                    )
                    // /leave-types/{id}
                    .service(
                        web::resource("/{id}").route(web::put().to(leave_type::update_leave_type)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance/card-check-in (gate readers)
                    .service(
                        web::resource("/card-check-in")
                            .wrap(Governor::new(&device_limiter))
                            .route(web::post().to(attendance::card_check_in)),
                    )
                    // /attendance/mark-absent (external scheduler)
                    .service(
                        web::resource("/mark-absent")
                            .route(web::post().to(attendance::mark_absent)),
                    )
                    // /attendance/records
                    .service(
                        web::resource("/records")
                            .route(web::get().to(attendance::list_records)),
                    )
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::put().to(attendance::check_out))
                            .route(web::post().to(attendance::check_in)),
                    ),
            )
            .service(
                web::scope("/cards")
                    // /cards
                    .service(web::resource("").route(web::post().to(cards::enroll_card)))
                    // /cards/{user_id} (GET) and /cards/{card_uid} (DELETE)
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(cards::list_cards))
                            .route(web::delete().to(cards::deactivate_card)),
                    ),
            )
            .service(
                web::scope("/work-groups")
                    // /work-groups
                    .service(
                        web::resource("")
                            .route(web::get().to(work_group::list_work_groups))
                            .route(web::post().to(work_group::create_work_group)),
                    )
                    // /work-groups/{id}/assign
                    .service(
                        web::resource("/{id}/assign")
                            .route(web::post().to(work_group::assign_user)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
