//! End-to-end checkout and order history, plus profile round trips.

use rust_decimal_macros::dec;
use thriftr_core::{Address, OrderStatus, ProductId};
use thriftr_integration_tests::TestContext;

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_checkout_prices_tax_and_shipping_exactly() {
    let ctx = TestContext::new();
    ctx.seed_product("p1", "Desk Lamp", "Furniture", 19.99);
    ctx.seed_product("p2", "Sticker", "Toys", 0.01);
    let mut session = ctx.signed_in_session().await;

    session
        .cart
        .set_quantity(&ProductId::new("p1"), None, None, 3)
        .await
        .expect("set");
    session
        .cart
        .set_quantity(&ProductId::new("p2"), None, None, 1)
        .await
        .expect("set");

    let summary = session.cart.summary();
    assert_eq!(summary.subtotal, dec!(59.98));
    assert_eq!(summary.tax, dec!(10.7964));
    assert_eq!(summary.shipping, dec!(50));
    assert_eq!(summary.total, dec!(120.7764));

    let order = session
        .checkout("12 Main St, Springfield, IL 62701, USA".to_string())
        .await
        .expect("checkout");
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.total.amount(), dec!(120.7764));
    assert_eq!(order.items.len(), 2);

    // Checkout empties the cart locally and remotely.
    assert!(session.cart.items().is_empty());
    assert_eq!(ctx.backend.document_count("carts"), 0);
}

#[tokio::test]
async fn test_checkout_requires_a_nonempty_cart() {
    let ctx = TestContext::new();
    let mut session = ctx.signed_in_session().await;
    assert!(session.checkout("12 Main St".to_string()).await.is_err());
}

// =============================================================================
// Order history
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_history_accumulates_and_cancellation_sticks() {
    let ctx = TestContext::new();
    ctx.seed_product("p1", "Desk Lamp", "Furniture", 19.99);
    let mut session = ctx.signed_in_session().await;

    for _ in 0..2 {
        session
            .cart
            .set_quantity(&ProductId::new("p1"), None, None, 1)
            .await
            .expect("set");
        session
            .checkout("12 Main St".to_string())
            .await
            .expect("checkout");
    }

    let history = session.orders().await.expect("orders");
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|o| o.status == OrderStatus::Placed));

    session.cancel_order(&history[0].id).await.expect("cancel");
    let history = session.orders().await.expect("orders");
    assert_eq!(history[0].status, OrderStatus::Cancelled);
    assert_eq!(history[1].status, OrderStatus::Placed);

    // One history document per user, regardless of order count.
    assert_eq!(ctx.backend.document_count("orders"), 1);
}

// =============================================================================
// Profile
// =============================================================================

#[tokio::test]
async fn test_profile_addresses_and_image_round_trip() {
    let ctx = TestContext::new();
    let session = ctx.signed_in_session().await;

    let profile = session.profile.fetch().await.expect("fetch");
    assert_eq!(profile.first_name, "Test");
    assert_eq!(profile.email, "shopper@example.com");

    let mut home = Address::new("12 Main St", "Springfield", "IL", "62701", "USA");
    home.is_default = true;
    let profile = session.profile.add_address(home.clone()).await.expect("add");
    assert_eq!(
        profile.default_address().expect("decode"),
        Some(home.clone())
    );

    let url = session
        .profile
        .set_image(vec![0xFF, 0xD8, 0xFF], "me.jpg", "image/jpeg")
        .await
        .expect("upload");
    let fetched = session.profile.fetch().await.expect("fetch");
    assert_eq!(fetched.image_path.as_deref(), Some(url.as_str()));

    let trimmed = session
        .profile
        .remove_address(&home.id)
        .await
        .expect("remove");
    assert!(trimmed.addresses().expect("decode").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_then_sign_in_restores_the_same_data() {
    let ctx = TestContext::new();
    ctx.seed_product("p1", "Desk Lamp", "Furniture", 19.99);
    let mut session = ctx.signed_in_session().await;

    session
        .cart
        .set_quantity(&ProductId::new("p1"), None, None, 2)
        .await
        .expect("set");
    // Flush the debounced write before leaving.
    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    session.pump_events();

    ctx.app.sign_out(&mut session).await.expect("sign out");

    let mut returned = ctx
        .app
        .sign_in("shopper@example.com", "hunter2!")
        .await
        .expect("sign in");
    returned.refresh().await.expect("refresh");
    assert_eq!(returned.cart.items().first().map(|l| l.quantity), Some(2));
}
