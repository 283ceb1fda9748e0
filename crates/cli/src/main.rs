//! DreamCollections CLI - migrations, seeding and shopping from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront database migrations
//! dc-cli migrate
//!
//! # Create an administrator
//! dc-cli admin create -u admin -e admin@dreamcollections.com -p 'long-password'
//!
//! # Seed the sample catalog through the API
//! dc-cli seed catalog --login admin --password 'long-password'
//!
//! # Delete expired OTPs
//! dc-cli otp purge
//!
//! # Shop
//! dc-cli shop products --sort price,asc
//! dc-cli shop cart add 3 --quantity 2
//! dc-cli shop login 9876543210 'password'
//! dc-cli shop checkout --name "Asha Rao" --phone 9876543210 ...
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - for `migrate`, `admin` and `otp`
//! - `DREAM_API_URL` - API base URL (default `http://localhost:8080/api`)
//! - `DREAM_STORE_PATH` - local session/cart file (default `.dreamcollections.json`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use dream_collections_client::{
    ApiClient, AuthSession, CartService, CatalogClient, CheckoutDetails, FileStorage, OrderService,
    ProductQuery,
};
use dream_collections_core::{CategoryId, ProductId, VariantId};

mod commands;

use commands::shop::{self, CartCommand};

#[derive(Parser)]
#[command(name = "dc-cli")]
#[command(author, version, about = "DreamCollections CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed data through the admin API
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// OTP housekeeping
    Otp {
        #[command(subcommand)]
        action: OtpAction,
    },
    /// Browse, fill a cart and place orders
    Shop {
        #[command(subcommand)]
        action: ShopAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// At least 8 characters
        #[arg(short, long)]
        password: String,

        #[arg(long, default_value = "Admin")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Create categories, products and variants from a YAML catalog
    Catalog {
        /// YAML catalog; the bundled sample when omitted
        #[arg(short, long)]
        file: Option<String>,

        /// Admin username, email or phone to sign in with first
        #[arg(long, requires = "password")]
        login: Option<String>,

        #[arg(long, requires = "login")]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum OtpAction {
    /// Delete expired codes
    Purge,
}

#[derive(Subcommand)]
enum ShopAction {
    /// Show the category tree
    Categories,
    /// List products
    Products {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
        /// `name`, `price` or `createdAt`, optionally `,asc` / `,desc`
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        category: Option<CategoryId>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        min_price: Option<Decimal>,
        #[arg(long)]
        max_price: Option<Decimal>,
    },
    /// Show one product
    Product { id: ProductId },
    /// Sign in with a password
    Login { login_id: String, password: String },
    /// Sign in with a code sent to your phone
    Otp {
        #[command(subcommand)]
        action: ShopOtpAction,
    },
    /// Show the signed-in profile
    Whoami,
    /// Sign out and drop the guest cart
    Logout,
    /// Work with the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order from the cart
    Checkout {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        postal_code: String,
        #[arg(long, default_value = "COD")]
        payment_method: String,
    },
    /// List your orders
    Orders,
    /// Show one order
    Order { id: String },
    /// Cancel an order
    Cancel { id: String },
    /// Order totals
    Stats,
}

#[derive(Subcommand)]
enum ShopOtpAction {
    /// Send a code
    Send {
        phone: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Send a fresh code
    Resend {
        phone: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Verify a code and sign in
    Verify {
        phone: String,
        code: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    Show,
    Add {
        variant: VariantId,
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..))]
        quantity: i32,
    },
    /// Set a quantity; 0 removes the line
    Update { variant: VariantId, quantity: i32 },
    Remove { variant: VariantId },
    Clear,
}

impl From<CartAction> for CartCommand {
    fn from(action: CartAction) -> Self {
        match action {
            CartAction::Show => Self::Show,
            CartAction::Add { variant, quantity } => Self::Add(variant, quantity),
            CartAction::Update { variant, quantity } => Self::Update(variant, quantity),
            CartAction::Remove { variant } => Self::Remove(variant),
            CartAction::Clear => Self::Clear,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn api_client() -> Result<ApiClient, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let storage = FileStorage::open(shop::store_path())?;
    Ok(ApiClient::from_env(Arc::new(storage)))
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                password,
                first_name,
                last_name,
                phone,
            } => {
                commands::admin::create_user(&commands::admin::NewAdmin {
                    username: &username,
                    email: &email,
                    password: &password,
                    first_name: &first_name,
                    last_name: &last_name,
                    phone: phone.as_deref(),
                })
                .await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog {
                file,
                login,
                password,
            } => {
                let api = api_client()?;
                let login = login.as_deref().zip(password.as_deref());
                commands::seed::catalog(
                    &AuthSession::new(api.clone()),
                    &CatalogClient::new(api),
                    file.as_deref(),
                    login,
                )
                .await?;
            }
        },
        Commands::Otp { action } => match action {
            OtpAction::Purge => {
                commands::otp::purge().await?;
            }
        },
        Commands::Shop { action } => run_shop(action, api_client()?).await?,
    }
    Ok(())
}

async fn run_shop(action: ShopAction, api: ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let session = AuthSession::new(api.clone());
    let catalog = CatalogClient::new(api.clone());
    let orders = OrderService::new(api.clone());
    let cart = CartService::for_api(api);

    match action {
        ShopAction::Categories => shop::categories(&catalog).await?,
        ShopAction::Products {
            page,
            size,
            sort,
            category,
            search,
            min_price,
            max_price,
        } => {
            let query = ProductQuery {
                sort,
                category_id: category,
                search,
                min_price,
                max_price,
                ..ProductQuery::page(page, size)
            };
            shop::products(&catalog, &query).await?;
        }
        ShopAction::Product { id } => shop::product(&catalog, id).await?,
        ShopAction::Login { login_id, password } => {
            shop::login(&session, &cart, &login_id, &password).await?;
        }
        ShopAction::Otp { action } => match action {
            ShopOtpAction::Send { phone, email } => {
                shop::send_otp(&session, &phone, email.as_deref()).await?;
            }
            ShopOtpAction::Resend { phone, email } => {
                let response = session.resend_otp(&phone, email.as_deref()).await?;
                tracing::info!("{}", response.message);
            }
            ShopOtpAction::Verify { phone, code, email } => {
                shop::verify_otp(&session, &cart, &phone, email.as_deref(), &code).await?;
            }
        },
        ShopAction::Whoami => shop::whoami(&session).await?,
        ShopAction::Logout => {
            session.logout()?;
            tracing::info!("Signed out");
        }
        ShopAction::Cart { action } => shop::cart(&cart, action.into()).await?,
        ShopAction::Checkout {
            name,
            phone,
            email,
            address,
            city,
            state,
            postal_code,
            payment_method,
        } => {
            let details = CheckoutDetails {
                customer_name: name,
                customer_phone: phone,
                customer_email: email,
                address,
                city,
                state,
                postal_code,
                payment_method,
                items: Vec::new(),
                total_amount: Decimal::ZERO,
            };
            shop::checkout(&orders, &cart, details).await?;
        }
        ShopAction::Orders => shop::my_orders(&orders).await,
        ShopAction::Order { id } => shop::order(&orders, &id).await?,
        ShopAction::Cancel { id } => shop::cancel(&orders, &id).await?,
        ShopAction::Stats => shop::stats(&orders).await,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_login_needs_password() {
        assert!(Cli::try_parse_from(["dc-cli", "seed", "catalog", "--login", "admin"]).is_err());
        assert!(
            Cli::try_parse_from([
                "dc-cli", "seed", "catalog", "--login", "admin", "--password", "pw"
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_cart_add_defaults_to_one() {
        let cli = Cli::try_parse_from(["dc-cli", "shop", "cart", "add", "7"]).unwrap_or_else(|e| {
            panic!("{e}");
        });
        let Commands::Shop {
            action:
                ShopAction::Cart {
                    action: CartAction::Add { variant, quantity },
                },
        } = cli.command
        else {
            panic!("expected cart add");
        };
        assert_eq!(variant, VariantId::new(7));
        assert_eq!(quantity, 1);
    }

    #[test]
    fn test_cart_add_rejects_non_positive_quantity() {
        for quantity in ["0", "-4"] {
            let parsed = Cli::try_parse_from([
                "dc-cli",
                "shop",
                "cart",
                "add",
                "3",
                "--quantity",
                quantity,
            ]);
            assert!(parsed.is_err(), "quantity {quantity} accepted");
        }
    }
}
