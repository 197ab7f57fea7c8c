use clap::Parser;
use hireportal::cli::{
    Args, build_config, handle_create_admin, init_logging, load_jwt_secret, open_database,
};
use hireportal::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref(), args.env) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.create_admin.as_deref() {
        handle_create_admin(&db, email).await;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to read local address");
        std::process::exit(1);
    });

    init_cleanup(&db).await;

    let config = build_config(
        db,
        jwt_secret,
        args.env,
        args.insecure_cookies,
        args.trust_proxy,
    );

    info!(address = %local_addr, env = ?args.env, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
