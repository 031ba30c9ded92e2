//! OpenIKT CLI
//!
//! Command-line client for an OpenIKT backend:
//! - Account sign up, log in and log out
//! - Quilt diff listing, details, spreadsheet export and creation
//! - OS image comparison listing, verification and creation
//! - Route table inspection
//! - Development server with API proxy

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use openikt_web::api::image_comparison::{CreateImageComparison, ImageSelection};
use openikt_web::api::quilt_diff::{CreateQuiltDiff, ExportRequest, Pagination};
use openikt_web::api::{auth, image_comparison, quilt_diff};
use openikt_web::config::{generate_default_config, Config, LoggingConfig};
use openikt_web::devserver;
use openikt_web::request::StderrNotifier;
use openikt_web::services::Services;
use openikt_web::utils::{download_file, extract_name_initials};

#[derive(Parser)]
#[command(name = "openikt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the OpenIKT quilt diff and image comparison service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Cookie sent to the backend, in name=value format (e.g. csrftoken=...)
    #[arg(long = "cookie", global = true)]
    pub cookies: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new account
    Signup {
        username: String,
        password: String,
        email: String,
    },

    /// Log in and check credentials
    Login { username: String, password: String },

    /// End the current session
    Logout,

    /// Show avatar initials for a display name
    Initials { name: String },

    /// List repositories with quilt diffs
    Repos,

    /// List quilt diffs
    QuiltDiffs {
        /// Repository id
        #[arg(long)]
        repo: Option<u64>,
        /// Diff tag id
        #[arg(long)]
        diff: Option<u64>,
    },

    /// Show one page of patches of a quilt diff
    Details {
        /// Quilt diff id
        id: u64,
        /// Patch type, as listed by `patch-types`
        diff_type: String,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "20")]
        page_size: u32,
    },

    /// Export a quilt diff as a spreadsheet
    Export {
        /// Quilt diff id
        id: u64,
        #[arg(long)]
        ref_a: String,
        #[arg(long)]
        ref_b: String,
        /// Directory for the file (default: downloads dir from config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List ref options for new quilt diffs
    Refs,

    /// List patch types
    PatchTypes,

    /// List quilt diff types
    DiffTypes,

    /// Start a quilt diff job
    CreateQuiltDiff {
        #[arg(long)]
        repo_from: String,
        #[arg(long)]
        repo_to: String,
        #[arg(long)]
        ref_from: String,
        #[arg(long)]
        ref_to: String,
        #[arg(long, default_value = "")]
        base_from: String,
        #[arg(long, default_value = "")]
        base_to: String,
        #[arg(long)]
        diff_type: String,
    },

    /// List image comparisons
    Images,

    /// Show the image comparison table
    ImageTable {
        /// Image comparison id
        #[arg(long)]
        id: Option<u64>,
    },

    /// List imported OS images
    ImageData,

    /// List supported operating systems
    OsList,

    /// List package types
    PkgTypes,

    /// Show package differences of an image comparison
    ImageDetails {
        /// Image comparison id
        id: u64,
        /// Package types to include (repeatable)
        #[arg(short = 't', long = "type")]
        types: Vec<String>,
        /// Package name filter
        #[arg(short, long)]
        package: Option<String>,
    },

    /// Show details of one package
    Package { id: u64 },

    /// Check that an image name is still free
    VerifyName { name: String },

    /// Check an image manifest URL
    VerifyUrl { url: String },

    /// Check whether two images were already compared
    DiffExists { image_a: String, image_b: String },

    /// Start an image comparison job
    CreateImageComparison {
        /// Request body as JSON, for importing new images
        #[arg(short, long, conflicts_with_all = ["image_a", "image_b"])]
        file: Option<PathBuf>,
        /// Existing image name
        #[arg(long, requires = "image_b")]
        image_a: Option<String>,
        /// Existing image name
        #[arg(long, requires = "image_a")]
        image_b: Option<String>,
    },

    /// List client routes
    Routes,

    /// Resolve a client location to its page
    Resolve { location: String },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the development server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        /// Backend to forward API calls to
        #[arg(long)]
        proxy: Option<String>,
        /// Directory with the built frontend
        #[arg(long)]
        static_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    init_logging(&config.logging);
    tracing::debug!("OpenIKT CLI v{}", env!("CARGO_PKG_VERSION"));

    let services = Services::new(&config, Arc::new(StderrNotifier))
        .context("Failed to set up the API client")?;
    for cookie in &cli.cookies {
        let Some((name, value)) = cookie.split_once('=') else {
            bail!("Invalid cookie {:?}, expected name=value", cookie);
        };
        services.set_cookie(name.trim(), value.trim());
    }

    let request = services.request();

    match cli.command {
        Commands::Signup {
            username,
            password,
            email,
        } => {
            let response = auth::sign_up(request, &username, &password, &email).await?;
            print_json(&response)?;
        }

        Commands::Login { username, password } => {
            let response = auth::log_in(request, &username, &password).await?;
            print_json(&response)?;
        }

        Commands::Logout => {
            let response = auth::log_out(request).await?;
            print_json(&response)?;
        }

        Commands::Initials { name } => match extract_name_initials(&name) {
            Some(initials) => println!("{}", initials),
            None => bail!("Name is empty"),
        },

        Commands::Repos => {
            let repos = quilt_diff::get_repository_list(request).await?;
            print_json(&repos.data)?;
        }

        Commands::QuiltDiffs { repo, diff } => {
            let overview = quilt_diff::get_overview_table_data(request, repo, diff).await?;
            print_json(&overview.data)?;
        }

        Commands::Details {
            id,
            diff_type,
            page,
            page_size,
        } => {
            let page = Pagination {
                current_page: page,
                page_size,
            };
            let details =
                quilt_diff::get_details_table_data(request, id, &diff_type, Some(page)).await?;
            let counts = details.patch_counts();
            print_json(&details.data)?;
            eprintln!(
                "{} patches, {} upstream",
                counts.patch_count, counts.ups_count
            );
        }

        Commands::Export {
            id,
            ref_a,
            ref_b,
            output_dir,
        } => {
            let export = ExportRequest {
                quilt_diff_id: id,
                ref_a,
                ref_b,
            };
            let file = quilt_diff::get_binary_export_data(request, &export).await?;

            let dir = output_dir.unwrap_or_else(|| config.downloads.path());
            let path = download_file(&dir, &file.filename, &file.data)
                .with_context(|| format!("Cannot save {}", file.filename))?;
            println!("Exported to {:?}", path);
        }

        Commands::Refs => {
            let refs = quilt_diff::get_refs(request).await?;
            print_json(&refs.data)?;
        }

        Commands::PatchTypes => {
            let types = quilt_diff::get_patch_types(request).await?;
            print_json(&types.data)?;
        }

        Commands::DiffTypes => {
            let types = quilt_diff::get_diff_types(request).await?;
            print_json(&types.data)?;
        }

        Commands::CreateQuiltDiff {
            repo_from,
            repo_to,
            ref_from,
            ref_to,
            base_from,
            base_to,
            diff_type,
        } => {
            let form = CreateQuiltDiff {
                repository_from: repo_from,
                repository_to: repo_to,
                ref_from,
                ref_to,
                base_from,
                base_to,
                diff_type,
            };
            let created = quilt_diff::create_quilt_diff(request, &form).await?;
            print_json(&created)?;
        }

        Commands::Images => {
            let list = image_comparison::get_image_comparison_list(request).await?;
            print_json(&list.data)?;
        }

        Commands::ImageTable { id } => {
            let table = image_comparison::get_image_comparison_table_data(request, id).await?;
            print_json(&table.data)?;
        }

        Commands::ImageData => {
            let images = image_comparison::get_image_list(request).await?;
            print_json(&images.data)?;
        }

        Commands::OsList => {
            let os = image_comparison::get_os_list(request).await?;
            print_json(&os.data)?;
        }

        Commands::PkgTypes => {
            let types = image_comparison::get_package_type_list(request).await?;
            print_json(&types.data)?;
        }

        Commands::ImageDetails { id, types, package } => {
            let details = image_comparison::get_image_comparison_details(
                request,
                id,
                &types,
                package.as_deref(),
            )
            .await?;
            print_json(&details.data)?;
        }

        Commands::Package { id } => {
            let package = image_comparison::get_package_details(request, id).await?;
            print_json(&package.data)?;
        }

        Commands::VerifyName { name } => {
            if image_comparison::verify_create_image_name(request, &name).await? {
                println!("{:?} is available", name);
            } else {
                bail!("{:?} is already taken", name);
            }
        }

        Commands::VerifyUrl { url } => {
            let result = image_comparison::verify_create_image_url(request, &url).await?;
            print_json(&result)?;
        }

        Commands::DiffExists { image_a, image_b } => {
            let result =
                image_comparison::verify_create_image_exist(request, &image_a, &image_b).await?;
            print_json(&result)?;
        }

        Commands::CreateImageComparison {
            file,
            image_a,
            image_b,
        } => {
            let data = match (file, image_a, image_b) {
                (Some(path), _, _) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Cannot read {:?}", path))?;
                    serde_json::from_str::<CreateImageComparison>(&content)
                        .with_context(|| format!("Invalid request body in {:?}", path))?
                }
                (None, Some(a), Some(b)) => CreateImageComparison {
                    img_a: ImageSelection::existing(a),
                    img_b: ImageSelection::existing(b),
                },
                _ => bail!("Pass --file, or both --image-a and --image-b"),
            };
            let created = image_comparison::create_image_comparison(request, &data).await?;
            print_json(&created)?;
        }

        Commands::Routes => {
            let router = services.router();
            println!("{:<36} {:<24} {:<26} {}", "Path", "Name", "Title", "Menu");
            println!("{}", "-".repeat(100));
            for (template, name, meta, _) in router.routes() {
                println!(
                    "{:<36} {:<24} {:<26} {}",
                    format!("{}{}", router.base(), template),
                    name.unwrap_or("-"),
                    meta.title.as_deref().unwrap_or("-"),
                    meta.menu_index.as_deref().unwrap_or("-"),
                );
            }
        }

        Commands::Resolve { location } => {
            let router = services.router();
            let route = router.push(&location).await?;

            println!("Path:    {}", router.href(&route));
            if let Some(page) = route.page() {
                println!("Page:    {}", page);
            }
            println!("Title:   {}", router.document_title().await);
            if let Some(menu) = &route.meta.menu_index {
                println!("Menu:    {}", menu);
            }
            for (key, value) in &route.params {
                println!("Param:   {} = {}", key, value);
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            if let Some(path) = output {
                std::fs::write(&path, &content)?;
                println!("Config written to {:?}", path);
            } else {
                print!("{}", content);
            }
        }

        Commands::Serve {
            port,
            proxy,
            static_dir,
        } => {
            if let Some(port) = port {
                config.dev_server.port = port;
            }
            if proxy.is_some() {
                config.dev_server.proxy_target = proxy;
            }
            if static_dir.is_some() {
                config.dev_server.static_dir = static_dir;
            }
            devserver::serve(&config.dev_server, &config.router.base).await?;
        }
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "openikt={level},openikt_web={level}",
            level = config.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
