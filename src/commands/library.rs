use anyhow::{Context, Result};
use std::path::Path;

use crate::storage::ArticleLibrary;

/// List publications, or one publication's stored articles
pub fn list(library_root: &Path, publication: Option<&str>) -> Result<()> {
    let library = ArticleLibrary::new(library_root);

    match publication {
        Some(slug) => {
            let articles = library
                .articles(slug)
                .with_context(|| format!("Failed to list articles for {slug}"))?;
            if articles.is_empty() {
                println!("No stored articles for {slug}");
                return Ok(());
            }
            for article_slug in articles {
                match library.read_frontmatter(slug, &article_slug)? {
                    Some(fm) => println!(
                        "{article_slug}  ({}, {} words)",
                        fm.published_at
                            .map(|d| d.format("%Y-%m-%d").to_string())
                            .unwrap_or_else(|| "undated".to_string()),
                        fm.word_count.unwrap_or(0),
                    ),
                    None => println!("{article_slug}"),
                }
            }
        }
        None => {
            let publications = library.publications().context("Failed to list library")?;
            if publications.is_empty() {
                println!("Library at {} is empty", library_root.display());
                return Ok(());
            }
            for slug in publications {
                let count = library.articles(&slug)?.len();
                println!("{slug}  ({count} articles)");
            }
        }
    }

    Ok(())
}

/// Print aggregate library statistics
pub fn stats(library_root: &Path) -> Result<()> {
    let library = ArticleLibrary::new(library_root);
    let stats = library.stats().context("Failed to walk library")?;

    println!("Library: {}", library_root.display());
    println!("  publications: {}", stats.publications);
    println!("  articles:     {}", stats.articles);
    println!("  total words:  {}", stats.total_words);

    Ok(())
}
