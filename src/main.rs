#[actix_web::main]
async fn main() -> std::io::Result<()> {
    church_media_server::run().await
}
