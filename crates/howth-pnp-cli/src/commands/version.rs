use howth_pnp::version::build_info;
use miette::{IntoDiagnostic, Result};

pub fn run(json: bool) -> Result<()> {
    let info = build_info();
    if json {
        println!("{}", serde_json::to_string(&info).into_diagnostic()?);
    } else {
        println!("{info}");
    }
    Ok(())
}
