use crate::{
    api::{admin, attendance, correction},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{
    middleware::{Condition, from_fn},
    web,
};

// Helper to build per-scope limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst size are non-zero");
    Governor::new(&cfg)
}

/// Mounts every API route under the configured prefix. A rate of 0 turns the
/// limiter off.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let limited = config.rate_protected_per_min > 0;
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Condition::new(limited, protected_limiter)) // rate limiting
            .service(
                web::scope("/attendance")
                    .service(web::resource("/clock-in").route(web::post().to(attendance::clock_in)))
                    .service(
                        web::resource("/break-start").route(web::post().to(attendance::break_start)),
                    )
                    .service(web::resource("/break-end").route(web::post().to(attendance::break_end)))
                    .service(web::resource("/clock-out").route(web::post().to(attendance::clock_out)))
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    .service(web::resource("/monthly").route(web::get().to(attendance::monthly)))
                    // /attendance/{date}
                    .service(web::resource("/{date}").route(web::get().to(attendance::day_detail))),
            )
            .service(
                web::scope("/corrections")
                    // /corrections/{date}
                    .service(
                        web::resource("/{date}")
                            .route(web::post().to(correction::submit_correction)),
                    )
                    // /corrections/{date}/breaks
                    .service(
                        web::resource("/{date}/breaks")
                            .route(web::post().to(correction::submit_break_correction)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .service(web::resource("/proposals").route(web::get().to(admin::list_proposals)))
                    .service(
                        web::resource("/proposals/{id}").route(web::get().to(admin::get_proposal)),
                    )
                    .service(
                        web::resource("/proposals/{id}/approve")
                            .route(web::put().to(admin::approve_proposal)),
                    )
                    .service(
                        web::resource("/break-proposals/{id}/approve")
                            .route(web::put().to(admin::approve_break_proposal)),
                    )
                    .service(
                        web::resource("/attendance/{employee_id}/{date}")
                            .route(web::put().to(admin::upsert_attendance)),
                    )
                    .service(
                        web::resource("/employees/{employee_id}/attendance")
                            .route(web::delete().to(admin::purge_employee)),
                    ),
            ),
    );
}
