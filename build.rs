use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    let includes = [PathBuf::from("proto"), protoc_bin_vendored::include_path()?];
    tonic_build::configure().compile(&[PathBuf::from("proto/dht.proto")], &includes)?;

    println!("cargo:rerun-if-changed=proto/dht.proto");
    Ok(())
}
