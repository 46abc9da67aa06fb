//! `codewright execute`: one request, one answer.

use std::path::Path;

use super::session::{CliResult, Session};

pub async fn run(config_path: Option<&Path>, query: String) -> CliResult<()> {
    let mut session = Session::open(config_path).await?;
    let result = session.orchestrator.process_user_request(query).await;
    session.close().await;

    println!("{}", result?);
    Ok(())
}
