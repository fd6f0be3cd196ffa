pub mod p910_order_payment_merge;
