use crate::{
    api::{admin, attendance, reference},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // period and burst are both non-zero above
        .expect("valid governor config");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let signup_limiter = Arc::new(build_limiter(config.rate_signup_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/signup")
                    .wrap(signup_limiter.clone())
                    .route(web::post().to(handlers::signup)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::resource("/me")
                    .route(web::get().to(handlers::profile))
                    .route(web::put().to(handlers::update_profile)),
            )
            .service(
                web::resource("/attendance").route(web::post().to(attendance::mark_attendance)),
            )
            .service(
                web::scope("/offices")
                    .service(
                        web::resource("")
                            .route(web::get().to(reference::list_offices))
                            .route(web::post().to(reference::save_office)),
                    )
                    .service(
                        web::resource("/{name}").route(web::delete().to(reference::delete_office)),
                    ),
            )
            .service(
                web::scope("/departments")
                    .service(
                        web::resource("")
                            .route(web::get().to(reference::list_departments))
                            .route(web::post().to(reference::add_department)),
                    )
                    .service(
                        web::resource("/{name}")
                            .route(web::delete().to(reference::delete_department)),
                    ),
            )
            .service(
                web::scope("/admin")
                    // /admin/attendance
                    .service(web::resource("/attendance").route(web::get().to(admin::list_records)))
                    .service(
                        web::resource("/attendance/export")
                            .route(web::get().to(admin::export_records)),
                    )
                    // /admin/attendance/{phone}/{date}
                    .service(
                        web::resource("/attendance/{phone}/{date}")
                            .route(web::put().to(admin::edit_record)),
                    )
                    .service(web::resource("/edits").route(web::get().to(admin::list_edits)))
                    .service(
                        web::resource("/settings/{key}")
                            .route(web::get().to(admin::get_setting))
                            .route(web::put().to(admin::put_setting)),
                    )
                    .service(web::resource("/access").route(web::post().to(admin::grant_access))),
            ),
    );
}

// LOGIN / SIGNUP
//  └─ access_token (phone + name)

// API REQUEST
//  └─ Authorization: Bearer access_token
//       └─ admin routes additionally check the whitelist setting
