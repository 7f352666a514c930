use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{
        loyalty::LoyaltyTier,
        order::OrderStatus,
        payment::{PaymentMethod, PaymentStatus},
    },
    dto::{
        auth::{LoginRequest, LoginResponse},
        clients::{ClientList, ClientStats, CreateClientRequest, UpdateClientRequest},
        orders::{CreateOrderRequest, OrderDetail, OrderItemRequest, OrderList},
        payments::{AddPaymentRequest, PaymentList},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{Client, Order, OrderItem, Payment, Product, Role},
    response::{ApiResponse, Meta},
    routes::{auth, clients, health, me, orders, params, payments, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        products::list_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        clients::list_clients,
        clients::create_client,
        clients::get_client,
        clients::update_client,
        clients::delete_client,
        clients::list_client_orders,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::confirm_order,
        orders::cancel_order,
        orders::list_order_payments,
        payments::add_payment,
        payments::get_payment,
        payments::settle_payment,
        payments::reject_payment,
        me::my_profile,
        me::my_orders,
        me::my_stats
    ),
    components(
        schemas(
            Role,
            LoyaltyTier,
            OrderStatus,
            PaymentMethod,
            PaymentStatus,
            Product,
            Client,
            Order,
            OrderItem,
            Payment,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateClientRequest,
            UpdateClientRequest,
            ClientList,
            ClientStats,
            OrderItemRequest,
            CreateOrderRequest,
            OrderDetail,
            OrderList,
            AddPaymentRequest,
            PaymentList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Client>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>,
            ApiResponse<Payment>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Clients", description = "Client accounts and loyalty"),
        (name = "Orders", description = "Order lifecycle"),
        (name = "Payments", description = "Payment reconciliation"),
        (name = "Me", description = "Endpoints for the logged-in client"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
