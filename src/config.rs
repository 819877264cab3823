//! Loads the site configuration from `folio.yaml` and the theme it names.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file marking a site's root directory.
pub const PROJECT_FILE: &str = "folio.yaml";

/// The directory under the site root holding post sources.
pub const POSTS_DIRECTORY: &str = "dat";

/// The file under the site root recording when the site was last built.
pub const LAST_RUN_FILE: &str = "folio_last_run.yml";

const DEFAULT_INDEX_SIZE: usize = 10;
const DEFAULT_FEED_SIZE: usize = 20;

pub(crate) const DEFAULT_HEADER: &str = include_str!("../theme/header.html");
pub(crate) const DEFAULT_FOOTER: &str = include_str!("../theme/footer.html");
pub(crate) const DEFAULT_SINGLE_PAGE: &str = include_str!("../theme/single_page.html");
pub(crate) const DEFAULT_INDEX_ITEM: &str = include_str!("../theme/index_item.html");
pub(crate) const DEFAULT_NAVIGATION: &str = include_str!("../theme/navigation.html");

fn yes() -> bool {
    true
}

#[derive(Deserialize)]
struct Project {
    site_name: String,
    base_url: Url,

    #[serde(default)]
    tagline: String,

    #[serde(default)]
    default_image: Option<String>,

    #[serde(default)]
    index_size: Option<i64>,

    #[serde(default)]
    feed_size: Option<usize>,

    /// Header and footer files, relative to the site root.
    #[serde(default)]
    header: Option<PathBuf>,
    #[serde(default)]
    footer: Option<PathBuf>,

    /// A directory of template overrides, relative to the site root.
    #[serde(default)]
    templates: Option<PathBuf>,

    #[serde(default = "yes")]
    build_scroll: bool,
    #[serde(default = "yes")]
    build_tags: bool,
    #[serde(default = "yes")]
    build_feed: bool,
}

/// Site-wide settings shared by every page.
#[derive(Clone, Debug)]
pub struct SiteConfig {
    /// Markup placed before every page's content.
    pub header: String,

    /// Markup placed after every page's content.
    pub footer: String,

    /// The absolute URL of the site root. Always ends in `/`.
    pub base_url: Url,

    pub site_name: String,

    /// The image shown in link previews for pages without an icon. Either an
    /// absolute URL or a path relative to `base_url`.
    pub default_image: Option<String>,

    /// Posts per index page. Never zero.
    pub index_size: usize,

    /// The site's one-line description, used as the feed subtitle.
    pub tagline: String,

    pub build_scroll: bool,
    pub build_tags: bool,
    pub build_feed: bool,

    /// The number of newest posts in the feed.
    pub feed_size: usize,
}

impl SiteConfig {
    /// Creates a configuration with the built-in header and footer and
    /// default settings.
    pub fn new(site_name: &str, base_url: Url) -> SiteConfig {
        SiteConfig {
            header: DEFAULT_HEADER.to_owned(),
            footer: DEFAULT_FOOTER.to_owned(),
            base_url: with_trailing_slash(base_url),
            site_name: site_name.to_owned(),
            default_image: None,
            index_size: DEFAULT_INDEX_SIZE,
            tagline: String::new(),
            build_scroll: true,
            build_tags: true,
            build_feed: true,
            feed_size: DEFAULT_FEED_SIZE,
        }
    }
}

/// The page templates. See `theme/` for the built-in versions.
#[derive(Clone, Debug)]
pub struct Theme {
    /// The body of a post page.
    pub single_page: String,

    /// One post on an index page.
    pub index_item: String,

    /// Newer/older links, shared by post and index pages.
    pub navigation: String,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            single_page: DEFAULT_SINGLE_PAGE.to_owned(),
            index_item: DEFAULT_INDEX_ITEM.to_owned(),
            navigation: DEFAULT_NAVIGATION.to_owned(),
        }
    }
}

impl Theme {
    /// Loads templates from `dir`, falling back to the built-in template for
    /// each file that doesn't exist.
    pub fn from_directory(dir: &Path) -> Result<Theme> {
        let defaults = Theme::default();
        Ok(Theme {
            single_page: read_or(&dir.join("single_page.html"), defaults.single_page)?,
            index_item: read_or(&dir.join("index_item.html"), defaults.index_item)?,
            navigation: read_or(&dir.join("navigation.html"), defaults.navigation)?,
        })
    }
}

pub struct Config {
    pub site: SiteConfig,
    pub theme: Theme,

    /// The directory holding [`PROJECT_FILE`].
    pub site_directory: PathBuf,
    pub posts_source_directory: PathBuf,
    pub output_directory: PathBuf,
}

impl Config {
    /// Looks for [`PROJECT_FILE`] in `dir` and then in each of its ancestors,
    /// and loads the first one found.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
                .with_context(|| format!("Loading configuration from `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;

        if project.base_url.cannot_be_a_base() {
            return Err(anyhow!("`base_url` must be an absolute URL with a path"));
        }

        let index_size = match project.index_size {
            None => DEFAULT_INDEX_SIZE,
            Some(size) if size < 1 => {
                log::warn!(
                    "`index_size` must be at least 1, got {}; using {}",
                    size,
                    DEFAULT_INDEX_SIZE
                );
                DEFAULT_INDEX_SIZE
            }
            Some(size) => size as usize,
        };

        let header = match &project.header {
            Some(rel) => read(&project_root.join(rel), "header")?,
            None => DEFAULT_HEADER.to_owned(),
        };
        let footer = match &project.footer {
            Some(rel) => read(&project_root.join(rel), "footer")?,
            None => DEFAULT_FOOTER.to_owned(),
        };
        let theme = match &project.templates {
            Some(rel) => Theme::from_directory(&project_root.join(rel))?,
            None => Theme::default(),
        };

        Ok(Config {
            site: SiteConfig {
                header,
                footer,
                base_url: with_trailing_slash(project.base_url),
                site_name: project.site_name,
                default_image: project.default_image,
                index_size,
                tagline: project.tagline,
                build_scroll: project.build_scroll,
                build_tags: project.build_tags,
                build_feed: project.build_feed,
                feed_size: project.feed_size.unwrap_or(DEFAULT_FEED_SIZE),
            },
            theme,
            site_directory: project_root.to_owned(),
            posts_source_directory: project_root.join(POSTS_DIRECTORY),
            output_directory: output_directory.to_owned(),
        })
    }
}

#[derive(Deserialize, Serialize)]
struct LastRun {
    /// Seconds since the epoch.
    last_run: i64,
}

/// Reads the time of the last completed build from the site's
/// [`LAST_RUN_FILE`]. Returns `None` when the site has never been built.
pub fn read_last_run(site_directory: &Path) -> Result<Option<DateTime<Utc>>> {
    let path = site_directory.join(LAST_RUN_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let record: LastRun = serde_yaml::from_reader(open(&path, "last run")?)
        .with_context(|| format!("Parsing `{}`", path.display()))?;
    match Utc.timestamp_opt(record.last_run, 0).single() {
        Some(when) => Ok(Some(when)),
        None => Err(anyhow!(
            "`{}` holds an invalid time: {}",
            path.display(),
            record.last_run
        )),
    }
}

/// Records `when` as the time of the last completed build.
pub fn write_last_run(site_directory: &Path, when: DateTime<Utc>) -> Result<()> {
    let path = site_directory.join(LAST_RUN_FILE);
    let record = serde_yaml::to_string(&LastRun {
        last_run: when.timestamp(),
    })?;
    fs::write(&path, record).with_context(|| format!("Writing `{}`", path.display()))
}

// `Url::join` treats the last path segment as a file unless it ends in a
// slash, which would drop e.g. `/blog` from every joined URL.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn open(path: &Path, kind: &str) -> Result<fs::File> {
    fs::File::open(path)
        .with_context(|| format!("Opening {} file `{}`", kind, path.display()))
}

fn read(path: &Path, kind: &str) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Reading {} file `{}`", kind, path.display()))
}

fn read_or(path: &Path, default: String) -> Result<String> {
    if path.exists() {
        read(path, "template")
    } else {
        Ok(default)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_directory_searches_parents() -> Result<()> {
        let root = tempfile::tempdir()?;
        fs::write(
            root.path().join(PROJECT_FILE),
            "site_name: Test Site\nbase_url: https://example.com/blog\nindex_size: 0\nheader: head.html\n",
        )?;
        fs::write(root.path().join("head.html"), "<head>{SITE_NAME}</head>")?;
        let nested = root.path().join(POSTS_DIRECTORY);
        fs::create_dir(&nested)?;

        let config = Config::from_directory(&nested, Path::new("/tmp/out"))?;
        assert_eq!("Test Site", config.site.site_name);
        assert_eq!("https://example.com/blog/", config.site.base_url.as_str());
        assert_eq!(DEFAULT_INDEX_SIZE, config.site.index_size);
        assert_eq!(DEFAULT_FEED_SIZE, config.site.feed_size);
        assert_eq!("<head>{SITE_NAME}</head>", config.site.header);
        assert_eq!(DEFAULT_FOOTER, config.site.footer);
        assert_eq!(nested, config.posts_source_directory);
        assert_eq!(root.path(), config.site_directory);
        assert!(config.site.build_tags);
        Ok(())
    }

    #[test]
    fn test_theme_overrides() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("navigation.html"), "<nav></nav>")?;
        let theme = Theme::from_directory(dir.path())?;
        assert_eq!("<nav></nav>", theme.navigation);
        assert_eq!(DEFAULT_SINGLE_PAGE, theme.single_page);
        Ok(())
    }

    #[test]
    fn test_last_run_record() -> Result<()> {
        let site = tempfile::tempdir()?;
        assert_eq!(None, read_last_run(site.path())?);

        let when = Utc.timestamp_opt(1618565400, 0).unwrap();
        write_last_run(site.path(), when)?;
        assert_eq!(Some(when), read_last_run(site.path())?);

        fs::write(site.path().join(LAST_RUN_FILE), "last_run: 0\n")?;
        assert_eq!(Some(Utc.timestamp_opt(0, 0).unwrap()), read_last_run(site.path())?);

        fs::write(site.path().join(LAST_RUN_FILE), "last_run: soon\n")?;
        assert!(read_last_run(site.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_missing_header_file_is_an_error() -> Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join(PROJECT_FILE);
        fs::write(
            &path,
            "site_name: S\nbase_url: https://example.com/\nheader: nope.html\n",
        )?;
        assert!(Config::from_project_file(&path, Path::new("out")).is_err());
        Ok(())
    }
}
