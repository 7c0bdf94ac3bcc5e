use std::sync::Arc;

use fart_common::Config;
use fart_identity::IdentityResolver;
use fart_query::routes;
use fart_query::state::AppState;
use fart_store::StoreClient;
use rocket::figment::Figment;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Request, Response};

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PATCH, OPTIONS, DELETE",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[rocket::launch]
async fn rocket() -> _ {
    let config = Config::load().expect("failed to load configuration");
    fart_common::init_tracing();

    let store = StoreClient::connect(&config.mongo_uri, &config.fart_db)
        .await
        .expect("failed to connect to store");
    let identity = Arc::new(IdentityResolver::new());

    let app_state = Arc::new(AppState::new(
        store,
        identity,
        config.fart_key.clone(),
        config.circles_topk,
    ));

    let figment = Figment::from(rocket::Config::figment()).merge(("port", config.fart_port));

    rocket::custom(figment)
        .manage(app_state)
        .mount(
            "/",
            rocket::routes![
                routes::index,
                routes::interactions,
                routes::circles,
                routes::dynamic_data,
                routes::coll_stats,
                routes::all_options,
            ],
        )
        .register(
            "/",
            rocket::catchers![
                routes::default_catcher,
                routes::unprocessable_entity,
                routes::bad_request,
                routes::not_found,
                routes::unauthorized,
                routes::internal_error,
            ],
        )
        .attach(CORS)
}
