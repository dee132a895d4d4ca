use docker_image_mover::cli::{Args, Runner};

#[tokio::main]
async fn main() {
    let args = Args::parse_args().from_env();
    let runner = Runner::new(args);

    if let Err(e) = runner.run().await {
        runner.logger().error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}
