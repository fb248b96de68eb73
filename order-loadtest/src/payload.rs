//! Request payloads for the order scenarios.
use rand::Rng;
use serde::Serialize;

/// Fixed long-form order name sent with every created order.
pub const ORDER_NAME: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Suspendisse a risus scelerisque, interdum orci ac, malesuada odio. Cras lacinia ante sit amet risus rutrum fringilla. Nulla ligula felis, aliquet consectetur interdum nec, sagittis ut lacus. Suspendisse potenti. Curabitur in lectus nunc. Ut mollis efficitur leo, eget congue justo. Pellentesque habitant morbi tristique senectus et netus et malesuada fames ac turpis egestas. Integer faucibus, libero in porta convallis, eros erat commodo diam, sed fermentum sapien nulla vel tortor. Duis consectetur mauris auctor, imperdiet nisl et, feugiat enim. Fusce ac enim eu turpis blandit interdum. Suspendisse ultrices tortor nunc, ac volutpat felis porttitor vitae. Vivamus venenatis, turpis et fringilla iaculis, velit diam bibendum felis, at mollis urna nisi tincidunt dolor. Fusce tincidunt pulvinar viverra.";

/// Exclusive upper bound of `order_id` in created orders.
pub const CREATE_ORDER_ID_LIMIT: u32 = 1_000_000;
/// Exclusive upper bound of `transport_id` in created orders.
pub const TRANSPORT_ID_LIMIT: u32 = 100_000;
/// Exclusive upper bound of the order id requested by the GET scenario.
pub const FETCH_ORDER_ID_LIMIT: u32 = 100_000;

#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub order_id: u32,
    pub name: &'static str,
    pub transport_id: u32,
}

impl NewOrder {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            order_id: rng.gen_range(0..CREATE_ORDER_ID_LIMIT),
            name: ORDER_NAME,
            transport_id: rng.gen_range(0..TRANSPORT_ID_LIMIT),
        }
    }

    pub fn to_body(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

pub fn random_order_id<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(0..FETCH_ORDER_ID_LIMIT)
}

pub fn orders_url(base_url: &str) -> String {
    format!("{}/orders", base_url.trim_end_matches('/'))
}

pub fn order_url(base_url: &str, order_id: u32) -> String {
    format!("{}/{order_id}", orders_url(base_url))
}
