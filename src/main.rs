mod app;
mod config;
mod kill;
mod list;
mod local_logger;
mod logger;
mod monitor;
mod prelude;
mod sys;
mod termination;
mod watch;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let res = crate::app::run().await;
    if let Err(err) = res {
        local_logger::clean_logger();
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
