//! Creates the skeleton of a new site in an existing directory: the project
//! file, an editable copy of the built-in theme, a sample post, and a
//! last-run record.

use crate::config::{
    self, DEFAULT_FOOTER, DEFAULT_HEADER, DEFAULT_INDEX_ITEM, DEFAULT_NAVIGATION,
    DEFAULT_SINGLE_PAGE, LAST_RUN_FILE, POSTS_DIRECTORY, PROJECT_FILE,
};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::Path;

/// The directory holding the scaffolded theme, relative to the site root.
const THEME_DIRECTORY: &str = "theme";

/// Directories created under the site root.
const DIRECTORIES: [&str; 3] = [POSTS_DIRECTORY, "img/icons", THEME_DIRECTORY];

const PROJECT_TEMPLATE: &str = "\
# The site's name, shown in page titles and the feed.
site_name: My Site

# Where the built site is published. Every link is built from this URL.
base_url: https://example.com/

tagline: A new folio site

# Posts per index page and in the feed.
index_size: 10
feed_size: 20

header: theme/header.html
footer: theme/footer.html
templates: theme

build_scroll: true
build_tags: true
build_feed: true
";

/// Scaffolds a new site under `dir`, which must already exist. Stops at the
/// first directory or file that can't be created; existing files are never
/// overwritten.
pub fn create_site(dir: &Path, now: DateTime<Utc>) -> Result<()> {
    if !dir.is_dir() {
        return Err(anyhow!(
            "`{}` doesn't exist or isn't a directory",
            dir.display()
        ));
    }
    if dir.join(PROJECT_FILE).exists() {
        return Err(anyhow!(
            "`{}` already has a `{}`",
            dir.display(),
            PROJECT_FILE
        ));
    }

    for rel in DIRECTORIES {
        let path = dir.join(rel);
        fs::create_dir_all(&path)
            .with_context(|| format!("Creating directory `{}`", path.display()))?;
        log::info!("created `{}`", path.display());
    }

    let theme = Path::new(THEME_DIRECTORY);
    let sample_post = format!("{}/{}.txt", POSTS_DIRECTORY, now.timestamp());
    let files = [
        (Path::new(PROJECT_FILE).to_owned(), PROJECT_TEMPLATE.to_owned()),
        (theme.join("header.html"), DEFAULT_HEADER.to_owned()),
        (theme.join("footer.html"), DEFAULT_FOOTER.to_owned()),
        (theme.join("single_page.html"), DEFAULT_SINGLE_PAGE.to_owned()),
        (theme.join("index_item.html"), DEFAULT_INDEX_ITEM.to_owned()),
        (theme.join("navigation.html"), DEFAULT_NAVIGATION.to_owned()),
        (sample_post.into(), welcome_post(now)),
    ];
    for (rel, contents) in &files {
        create_file(&dir.join(rel), contents)?;
    }

    config::write_last_run(dir, DateTime::<Utc>::from(std::time::UNIX_EPOCH))?;
    log::info!("created `{}`", dir.join(LAST_RUN_FILE).display());
    Ok(())
}

fn welcome_post(now: DateTime<Utc>) -> String {
    format!(
        "title: Welcome\n\
         date: {}\n\
         tags: meta\n\
         summary: The first post on a new site.\n\
         ###\n\
         # Welcome\n\
         \n\
         This post lives in `{}/`. Edit it, or add more `.txt` files next to it.\n\
         #MORE\n\
         - **bold**, *italic*, and `code` work inline\n\
         - _underline_ too\n",
        now.timestamp(),
        POSTS_DIRECTORY
    )
}

fn create_file(path: &Path, contents: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Creating `{}`", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Writing `{}`", path.display()))?;
    log::info!("created `{}`", path.display());
    Ok(())
}
