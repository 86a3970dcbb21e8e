use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::TokenService;
use crate::logger::RequestLogger;
use crate::routes::{health_check, issue_tokens, refresh};

pub fn run(listener: TcpListener, service: TokenService) -> Result<Server, std::io::Error> {
    let service = web::Data::new(service);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(service.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/auth")
                    .route("/token", web::post().to(issue_tokens))
                    .route("/refresh", web::post().to(refresh)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
