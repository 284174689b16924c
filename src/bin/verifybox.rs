use anyhow::Result;

fn main() -> Result<()> {
    verifybox::cli::run()
}
