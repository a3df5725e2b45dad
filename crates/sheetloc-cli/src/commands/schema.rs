use std::fs;
use std::path::PathBuf;

pub fn run_schema(out_dir: PathBuf) -> color_eyre::Result<()> {
    fs::create_dir_all(&out_dir)?;
    macro_rules! dump {
        ($ty:ty, $name:literal) => {{
            let schema = schemars::schema_for!($ty);
            let path = out_dir.join($name);
            let f = std::fs::File::create(&path)?;
            serde_json::to_writer_pretty(f, &schema)?;
        }};
    }
    dump!(sheetloc_domain::ExtractSummary, "extract_summary.schema.json");
    dump!(sheetloc_domain::TranslateSummary, "translate_summary.schema.json");
    dump!(sheetloc_domain::CheckSummary, "check_summary.schema.json");
    dump!(sheetloc_domain::CheckReport, "check_report.schema.json");
    dump!(sheetloc_domain::ReinjectSummary, "reinject_summary.schema.json");
    crate::ui_ok!("Schemas written to {}", out_dir.display());
    Ok(())
}
