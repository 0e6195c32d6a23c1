//! Company-list input: one name per line, blanks skipped.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::info;

pub async fn read_company_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read company list: {}", path.display()))?;

    let companies: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    info!(count = companies.len(), path = %path.display(), "loaded company list");
    Ok(companies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn trims_and_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Acme Inc\n\n  GhostCorp  \n\t\n").unwrap();

        let names = read_company_list(file.path()).await.unwrap();
        assert_eq!(names, vec!["Acme Inc", "GhostCorp"]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error_with_path_context() {
        let err = read_company_list(Path::new("definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("definitely/not/here.txt"));
    }
}
