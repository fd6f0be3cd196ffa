pub mod a030_order_line;
pub mod a031_settlement_payment;
