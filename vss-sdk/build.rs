fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Point prost/tonic at a vendored protoc so the build works in
    // environments without a system protobuf-compiler installed.
    if std::env::var_os("PROTOC").is_none() {
        if let Ok(protoc) = protoc_bin_vendored::protoc_bin_path() {
            std::env::set_var("PROTOC", protoc);
        }
    }
    tonic_build::configure()
        .build_server(false)
        .compile_protos(
            &["proto/kuksa/val/v2/val.proto"],
            &["proto"],
        )?;
    Ok(())
}
