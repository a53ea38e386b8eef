fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .compile_protos(&["proto/insights.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/insights.proto");

    Ok(())
}
