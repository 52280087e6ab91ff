//! Pokes a locally running server, e.g. one started with `--tasks demos/tasks.json`.

const URL: &str = "http://localhost:8080";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let hc = httpc_test::new_client(URL)?;

    hc.do_get("/__reload__").await?.print().await?;
    hc.do_get("/uptime").await?.print().await?;
    hc.do_get("/nonexistent").await?.print().await?;

    let response = reqwest::Client::new()
        .post(format!("{URL}/echo-payload?source=quick_dev"))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("branch=main&tag=v1&tag=latest")
        .send()
        .await?;
    println!("echo-payload: {}", response.status());

    Ok(())
}
