use axnote_tui::tracing_setup;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    // Keep the guard alive for the whole session so buffered log lines are
    // flushed on exit.
    let _log_guard = tracing_setup::init_tracing();
    axnote_tui::try_main().await
}
