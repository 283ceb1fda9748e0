//! Shopping from the terminal through the API client.
//!
//! The session, guest cart and locally kept orders live in a JSON file
//! (`DREAM_STORE_PATH`, default `.dreamcollections.json`), so a guest cart
//! built before `login` is synced into the server cart afterwards.

#![allow(clippy::print_stdout)]

use rust_decimal::Decimal;

use dream_collections_client::orders::GuestOrderItem;
use dream_collections_client::{
    ApiClient, AuthSession, CartService, CartSnapshot, CatalogClient, CheckoutDetails,
    ClientError, OrderRecord, OrderService, ProductQuery,
};
use dream_collections_core::api::{CategoryResponse, ProductResponse};
use dream_collections_core::{Price, ProductId, VariantId};

/// Environment variable naming the local store file.
pub const STORE_PATH_ENV: &str = "DREAM_STORE_PATH";

/// Used when `DREAM_STORE_PATH` is not set.
pub const DEFAULT_STORE_PATH: &str = ".dreamcollections.json";

/// Path of the local store file.
#[must_use]
pub fn store_path() -> String {
    std::env::var(STORE_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string())
}

fn inr(amount: Decimal) -> String {
    Price::inr(amount).to_string()
}

fn print_category(category: &CategoryResponse, depth: usize) {
    println!(
        "{:indent$}[{}] {}",
        "",
        category.id,
        category.name,
        indent = depth * 2
    );
    for sub in &category.sub_categories {
        print_category(sub, depth + 1);
    }
}

fn print_product(product: &ProductResponse) {
    println!(
        "[{}] {} - {} ({})",
        product.id,
        product.name,
        inr(product.price),
        product.category.name
    );
    for variant in &product.variants {
        println!(
            "    variant {} - {} ({} in stock)",
            variant.id, variant.size, variant.stock_quantity
        );
    }
}

/// Print the category tree.
///
/// # Errors
///
/// Returns error if the request fails.
pub async fn categories(catalog: &CatalogClient) -> Result<(), ClientError> {
    for category in catalog.categories().await? {
        print_category(&category, 0);
    }
    Ok(())
}

/// Print one page of products.
///
/// # Errors
///
/// Returns error if the request fails or the query is rejected.
pub async fn products(catalog: &CatalogClient, query: &ProductQuery) -> Result<(), ClientError> {
    let page = catalog.products(query).await?;
    for product in &page.content {
        print_product(product);
    }
    println!(
        "page {} of {} ({} products)",
        page.page + 1,
        page.total_pages.max(1),
        page.total_elements
    );
    Ok(())
}

/// Print one product.
///
/// # Errors
///
/// Returns error if the request fails or the product does not exist.
pub async fn product(catalog: &CatalogClient, id: ProductId) -> Result<(), ClientError> {
    let product = catalog.product(id).await?;
    print_product(&product);
    if let Some(description) = &product.description {
        println!("    {description}");
    }
    Ok(())
}

/// Sign in with a password and move the guest cart to the server.
///
/// # Errors
///
/// Returns error if the credentials are rejected.
pub async fn login(
    session: &AuthSession,
    cart: &CartService<ApiClient>,
    login_id: &str,
    password: &str,
) -> Result<(), ClientError> {
    let user = session.login(login_id, password).await?;
    println!("Signed in as {} ({})", user.username, user.email);
    let moved = cart.sync_guest_cart().await;
    if moved > 0 {
        println!("Moved {moved} guest cart line(s) to your cart");
    }
    Ok(())
}

/// Ask for a login code.
///
/// # Errors
///
/// Returns error if the server refuses to send a code.
pub async fn send_otp(
    session: &AuthSession,
    phone: &str,
    email: Option<&str>,
) -> Result<(), ClientError> {
    let response = session.send_otp(phone, email).await?;
    println!("{}", response.message);
    if let Some(masked) = response.masked_phone {
        println!("Code sent to {masked}");
    }
    Ok(())
}

/// Sign in with a login code and move the guest cart to the server.
///
/// # Errors
///
/// Returns error if the code is rejected.
pub async fn verify_otp(
    session: &AuthSession,
    cart: &CartService<ApiClient>,
    phone: &str,
    email: Option<&str>,
    code: &str,
) -> Result<(), ClientError> {
    let user = session.verify_otp(phone, email, code).await?;
    println!("Signed in as {}", user.username);
    let moved = cart.sync_guest_cart().await;
    if moved > 0 {
        println!("Moved {moved} guest cart line(s) to your cart");
    }
    Ok(())
}

/// Show who is signed in.
///
/// # Errors
///
/// Returns error if the session is no longer valid.
pub async fn whoami(session: &AuthSession) -> Result<(), ClientError> {
    if !session.is_authenticated() {
        println!("Not signed in (guest)");
        return Ok(());
    }
    let profile = session.profile().await?;
    println!(
        "{} {} <{}> [{}]",
        profile.first_name, profile.last_name, profile.email, profile.role
    );
    Ok(())
}

/// Print a cart.
pub fn print_cart(cart: &CartSnapshot) {
    match cart {
        CartSnapshot::Remote(view) => {
            for line in &view.items {
                println!(
                    "variant {} - {} ({}) x{} = {}",
                    line.product_variant_id,
                    line.product_name,
                    line.variant_size,
                    line.quantity,
                    inr(line.subtotal)
                );
            }
            println!(
                "{} item(s), total {}",
                view.total_items_count,
                inr(view.total_price)
            );
        }
        CartSnapshot::Guest(guest) => {
            for item in &guest.items {
                println!("variant {} x{}", item.product_variant_id, item.quantity);
            }
            println!("{} item(s) in guest cart", guest.item_count());
        }
    }
}

/// Cart subcommands.
#[derive(Debug, Clone, Copy)]
pub enum CartCommand {
    Show,
    Add(VariantId, i32),
    Update(VariantId, i32),
    Remove(VariantId),
    Clear,
}

/// Run a cart subcommand and print the resulting cart.
///
/// # Errors
///
/// Returns error if the guest cart cannot be saved.
pub async fn cart(service: &CartService<ApiClient>, command: CartCommand) -> Result<(), ClientError> {
    let snapshot = match command {
        CartCommand::Show => service.get_cart().await,
        CartCommand::Add(variant, quantity) => service.add_item(variant, quantity).await?,
        CartCommand::Update(variant, quantity) => service.update_item(variant, quantity).await?,
        CartCommand::Remove(variant) => service.remove_item(variant).await?,
        CartCommand::Clear => {
            service.clear().await?;
            println!("Cart cleared");
            return Ok(());
        }
    };
    print_cart(&snapshot);
    Ok(())
}

fn print_order(order: &OrderRecord) {
    match order {
        OrderRecord::Remote(order) => {
            println!(
                "order {} - {} - {} ({} line(s), placed {})",
                order.id,
                order.status,
                inr(order.total_amount),
                order.items.len(),
                order.created_at.format("%Y-%m-%d %H:%M")
            );
        }
        OrderRecord::Guest(order) => {
            println!(
                "order {} - {} - {} (kept locally, placed {})",
                order.id,
                order.status,
                inr(order.total_amount),
                order.order_date.format("%Y-%m-%d %H:%M")
            );
        }
    }
}

/// Place an order from the current cart.
///
/// # Errors
///
/// Returns error if the order cannot be kept locally either.
pub async fn checkout(
    orders: &OrderService,
    cart: &CartService<ApiClient>,
    details: CheckoutDetails,
) -> Result<(), ClientError> {
    let mut details = details;
    if let CartSnapshot::Guest(guest) = cart.get_cart().await {
        details.items = guest
            .items
            .iter()
            .map(|item| GuestOrderItem {
                product_variant_id: item.product_variant_id,
                product_name: None,
                quantity: item.quantity,
                price: None,
            })
            .collect();
    }
    let order = orders.create_order(&details).await?;
    if matches!(order, OrderRecord::Guest(_)) {
        println!("The store could not take the order; it has been kept locally.");
    }
    print_order(&order);
    Ok(())
}

/// List orders.
pub async fn my_orders(orders: &OrderService) {
    let records = orders.my_orders().await.into_records();
    if records.is_empty() {
        println!("No orders yet");
    }
    for order in &records {
        print_order(order);
    }
}

/// Show one order.
///
/// # Errors
///
/// Returns error if the order cannot be found.
pub async fn order(orders: &OrderService, id: &str) -> Result<(), ClientError> {
    print_order(&orders.order_by_id(id).await?);
    Ok(())
}

/// Cancel an order.
///
/// # Errors
///
/// Returns error if the order cannot be found.
pub async fn cancel(orders: &OrderService, id: &str) -> Result<(), ClientError> {
    print_order(&orders.cancel_order(id).await?);
    Ok(())
}

/// Print order totals.
pub async fn stats(orders: &OrderService) {
    let stats = orders.order_stats().await;
    println!("orders:    {}", stats.total_orders);
    println!("spent:     {}", inr(stats.total_amount));
    println!("pending:   {}", stats.pending_orders);
    println!("completed: {}", stats.completed_orders);
}
