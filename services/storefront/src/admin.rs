//! Back-office management: users, products, orders and reports

use common::ListQuery;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::{ShopError, ShopResult},
    models::{
        CustomerOrder, NewProduct, Order, OrderStatus, PaymentMethod, Product, UpdateProduct,
        UpdateUser, User, UserProfile,
    },
    repositories::{ProductRepository, UserRepository},
    validation::{validate_new_product, validate_product_update},
};

/// A user's profile with their order history
#[derive(Debug, Clone, Serialize)]
pub struct UserDetails {
    pub user: UserProfile,
    pub orders: Vec<Order>,
}

/// Headline counts for the admin landing page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub users: usize,
    pub blocked_users: usize,
    pub products: usize,
    pub out_of_stock: usize,
    pub orders: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBreakdown {
    pub processing: usize,
    pub shipped: usize,
    pub delivered: usize,
}

impl StatusBreakdown {
    fn record(&mut self, status: OrderStatus) {
        match status {
            OrderStatus::Processing => self.processing += 1,
            OrderStatus::Shipped => self.shipped += 1,
            OrderStatus::Delivered => self.delivered += 1,
        }
    }
}

/// Revenue split by how customers paid
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaymentBreakdown {
    pub cod: f64,
    pub upi: f64,
}

/// Sales figures, recomputed from the orders on every request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesReport {
    pub total_orders: usize,
    pub total_revenue: f64,
    pub average_order_value: f64,
    pub status: StatusBreakdown,
    pub revenue_by_payment: PaymentBreakdown,
}

/// Aggregate a set of orders
pub fn sales_report<'a>(orders: impl IntoIterator<Item = &'a Order>) -> SalesReport {
    let mut report = SalesReport::default();

    for order in orders {
        report.total_orders += 1;
        report.total_revenue += order.total;
        report.status.record(order.status);
        match order.payment_method {
            PaymentMethod::Cod => report.revenue_by_payment.cod += order.total,
            PaymentMethod::Upi => report.revenue_by_payment.upi += order.total,
        }
    }

    if report.total_orders > 0 {
        report.average_order_value = report.total_revenue / report.total_orders as f64;
    }
    report
}

/// Every order across all users, tagged with its owner
pub fn flatten_orders(users: &[User]) -> Vec<CustomerOrder> {
    users
        .iter()
        .flat_map(|user| {
            user.orders.iter().map(|order| CustomerOrder {
                order: order.clone(),
                user_id: user.id.clone(),
                user_name: user.name.clone(),
                user_email: user.email.clone(),
            })
        })
        .collect()
}

fn require_confirmation(confirm: bool) -> ShopResult<()> {
    if confirm {
        Ok(())
    } else {
        Err(ShopError::ConfirmationRequired)
    }
}

#[derive(Clone)]
pub struct AdminService {
    users: UserRepository,
    products: ProductRepository,
}

impl AdminService {
    pub fn new(users: UserRepository, products: ProductRepository) -> Self {
        Self { users, products }
    }

    // Users

    pub async fn list_users(&self) -> ShopResult<Vec<UserProfile>> {
        let users = self.users.get_all().await?;
        Ok(users.iter().map(User::profile).collect())
    }

    pub async fn user_details(&self, id: &str) -> ShopResult<UserDetails> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or(ShopError::UserNotFound)?;
        Ok(UserDetails {
            user: user.profile(),
            orders: user.orders,
        })
    }

    /// Set the block flag, or flip it when `blocked` is `None`
    pub async fn set_blocked(&self, id: &str, blocked: Option<bool>) -> ShopResult<UserProfile> {
        let user = self
            .users
            .modify(id, |user| {
                let next = blocked.unwrap_or(!user.is_blocked);
                Ok::<_, ShopError>((next != user.is_blocked).then(|| UpdateUser::blocked(next)))
            })
            .await?;

        info!(
            "User {} is now {}",
            id,
            if user.is_blocked { "blocked" } else { "active" }
        );
        Ok(user.profile())
    }

    pub async fn delete_user(&self, id: &str, confirm: bool) -> ShopResult<()> {
        require_confirmation(confirm)?;
        self.users.delete(id).await?;
        Ok(())
    }

    // Products

    pub async fn list_products(&self) -> ShopResult<Vec<Product>> {
        Ok(self.products.get_all(&ListQuery::new()).await?)
    }

    pub async fn create_product(&self, product: &NewProduct) -> ShopResult<Product> {
        validate_new_product(product).map_err(ShopError::Validation)?;
        Ok(self.products.create(product).await?)
    }

    pub async fn update_product(&self, id: &str, changes: &UpdateProduct) -> ShopResult<Product> {
        validate_product_update(changes).map_err(ShopError::Validation)?;
        Ok(self.products.update(id, changes).await?)
    }

    pub async fn delete_product(&self, id: &str, confirm: bool) -> ShopResult<()> {
        require_confirmation(confirm)?;
        self.products.delete(id).await?;
        Ok(())
    }

    // Orders

    pub async fn all_orders(&self) -> ShopResult<Vec<CustomerOrder>> {
        let users = self.users.get_all().await?;
        Ok(flatten_orders(&users))
    }

    /// Rewrite one order's status inside its owner's order array
    ///
    /// Any transition is accepted; moving backwards is only logged.
    pub async fn update_order_status(
        &self,
        user_id: &str,
        order_id: &str,
        status: OrderStatus,
    ) -> ShopResult<Order> {
        let user = self
            .users
            .modify(user_id, |user| -> ShopResult<Option<UpdateUser>> {
                let position = user
                    .orders
                    .iter()
                    .position(|order| order.id == order_id)
                    .ok_or_else(|| ShopError::NotFound(format!("Order {}", order_id)))?;

                let current = user.orders[position].status;
                if current == status {
                    return Ok(None);
                }
                if current.is_regression_to(status) {
                    warn!(
                        "Order {} of user {} moved back from {} to {}",
                        order_id, user_id, current, status
                    );
                }

                let mut orders = user.orders.clone();
                orders[position].status = status;
                Ok(Some(UpdateUser::orders(orders)))
            })
            .await?;

        info!("Order {} of user {} set to {}", order_id, user_id, status);
        user.orders
            .into_iter()
            .find(|order| order.id == order_id)
            .ok_or_else(|| ShopError::NotFound(format!("Order {}", order_id)))
    }

    // Reports

    pub async fn dashboard(&self) -> ShopResult<Dashboard> {
        let users = self.users.get_all().await?;
        let products = self.products.get_all(&ListQuery::new()).await?;

        Ok(Dashboard {
            users: users.len(),
            blocked_users: users.iter().filter(|user| user.is_blocked).count(),
            products: products.len(),
            out_of_stock: products.iter().filter(|product| !product.in_stock()).count(),
            orders: users.iter().map(|user| user.orders.len()).sum(),
        })
    }

    pub async fn reports(&self) -> ShopResult<SalesReport> {
        let users = self.users.get_all().await?;
        Ok(sales_report(users.iter().flat_map(|user| user.orders.iter())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use common::{RecordStore, store::MemoryRecordStore};
    use serde_json::json;

    fn order(id: &str, total: f64, payment: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "date": "2024-06-10T06:13:20.000Z",
            "items": [],
            "total": total,
            "address": {"name": "Ann", "phone": "9876543210", "street": "MG Road", "city": "Pune", "pincode": "411001"},
            "paymentMethod": payment,
            "upiId": "",
            "status": status
        })
    }

    fn admin() -> (AdminService, RecordStore) {
        let store = RecordStore::Memory(
            MemoryRecordStore::from_value(json!({
                "users": [
                    {
                        "id": "u1", "name": "Ann", "email": "ann@example.com", "password": "x",
                        "orders": [
                            order("100", 1000.0, "COD", "Processing"),
                            order("101", 500.0, "UPI", "Shipped")
                        ]
                    },
                    {
                        "id": "u2", "name": "Bob", "email": "bob@example.com", "password": "x",
                        "isBlock": true,
                        "orders": [order("200", 1500.0, "UPI", "Delivered")]
                    },
                    {"id": "a1", "name": "Root", "email": "root@example.com", "password": "x", "role": "Admin"}
                ],
                "products": [
                    {"id": "p1", "name": "Tee", "price": 499, "category": "Men", "stock": 3},
                    {"id": "p2", "name": "Cap", "price": 299, "category": "Women", "stock": 0}
                ]
            }))
            .unwrap(),
        );
        (
            AdminService::new(
                UserRepository::new(store.clone()),
                ProductRepository::new(store.clone()),
            ),
            store,
        )
    }

    #[tokio::test]
    async fn test_reports_aggregate_all_orders() {
        let (admin, _) = admin();

        let report = admin.reports().await.unwrap();
        assert_eq!(report.total_orders, 3);
        assert_eq!(report.total_revenue, 3000.0);
        assert_eq!(report.average_order_value, 1000.0);
        assert_eq!(
            report.status,
            StatusBreakdown {
                processing: 1,
                shipped: 1,
                delivered: 1
            }
        );
        assert_eq!(report.revenue_by_payment.cod, 1000.0);
        assert_eq!(report.revenue_by_payment.upi, 2000.0);
    }

    #[test]
    fn test_empty_report_has_zero_average() {
        let report = sales_report(std::iter::empty());
        assert_eq!(report, SalesReport::default());
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let (admin, _) = admin();

        let dashboard = admin.dashboard().await.unwrap();
        assert_eq!(
            dashboard,
            Dashboard {
                users: 3,
                blocked_users: 1,
                products: 2,
                out_of_stock: 1,
                orders: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_all_orders_are_tagged_with_their_owner() {
        let (admin, _) = admin();

        let orders = admin.all_orders().await.unwrap();
        assert_eq!(orders.len(), 3);
        assert_eq!(orders[2].user_id, "u2");
        assert_eq!(orders[2].user_email, "bob@example.com");
        assert_eq!(orders[2].order.id, "200");
    }

    #[tokio::test]
    async fn test_status_change_is_visible_in_user_orders() {
        let (admin, _) = admin();

        let order = admin
            .update_order_status("u1", "100", OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.total, 1000.0);

        let details = admin.user_details("u1").await.unwrap();
        assert_eq!(details.orders[0].status, OrderStatus::Delivered);
        assert_eq!(details.orders[1].status, OrderStatus::Shipped);

        // Regressions are allowed
        let order = admin
            .update_order_status("u1", "100", OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Processing);

        let err = admin
            .update_order_status("u1", "999", OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_block_toggle_and_explicit_set() {
        let (admin, store) = admin();

        let profile = admin.set_blocked("u1", None).await.unwrap();
        assert!(profile.is_blocked);
        assert_eq!(store.get("users", "u1").await.unwrap()["isBlock"], true);

        let profile = admin.set_blocked("u1", None).await.unwrap();
        assert!(!profile.is_blocked);

        let profile = admin.set_blocked("u2", Some(true)).await.unwrap();
        assert!(profile.is_blocked);
        // Already blocked: nothing written
        assert_eq!(store.get("users", "u2").await.unwrap().get("version"), None);
    }

    #[tokio::test]
    async fn test_destructive_actions_need_confirmation() {
        let (admin, store) = admin();

        let err = admin.delete_user("u2", false).await.unwrap_err();
        assert!(matches!(err, ShopError::ConfirmationRequired));
        assert!(store.get("users", "u2").await.is_ok());

        admin.delete_user("u2", true).await.unwrap();
        assert!(store.get("users", "u2").await.is_err());

        let err = admin.delete_product("p1", false).await.unwrap_err();
        assert!(matches!(err, ShopError::ConfirmationRequired));
        admin.delete_product("p1", true).await.unwrap();
        assert_eq!(admin.list_products().await.unwrap().len(), 1);

        assert!(matches!(
            admin.user_details("u2").await.unwrap_err(),
            ShopError::UserNotFound
        ));
    }

    #[tokio::test]
    async fn test_product_crud_validates_fields() {
        let (admin, _) = admin();

        let err = admin
            .create_product(&NewProduct {
                name: "Free Tee".to_string(),
                price: 0.0,
                category: Category::Men,
                stock: 1,
                image: "tee.png".to_string(),
                description: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));

        let created = admin
            .create_product(&NewProduct {
                name: "Denim Jacket".to_string(),
                price: 3999.0,
                category: Category::Women,
                stock: 2,
                image: "jacket.png".to_string(),
                description: "Blue".to_string(),
            })
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let updated = admin
            .update_product(
                &created.id,
                &UpdateProduct {
                    stock: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock, 0);
        assert_eq!(updated.price, 3999.0);

        let err = admin
            .update_product(&created.id, &UpdateProduct::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }
}
