//! Central limit order book contract interface.
//!
//! `clob_core::intent::OrderIntent` is an abstract tagged enum with no
//! knowledge of calldata; `encode_calldata` here is the one place that
//! turns an intent into the bytes the executor signs and sends, using the
//! generated `*Call::abi_encode` methods this `sol!` macro produces.

use alloy::primitives::Bytes;
use alloy::sol;
use alloy::sol_types::SolCall;
use clob_core::intent::{OrderIntent, OrderSide};

sol! {
    /// On-chain order book interface (subset used by order submission).
    /// Market is keyed by `address` and order ids are `uint256`, matching
    /// `clob_core::intent::OrderIntent`'s field types one-for-one so
    /// `encode_calldata` can hand values straight through without conversion.
    #[sol(rpc)]
    interface ICentralLimitOrderBook {
        function placeOrder(
            address market,
            uint8 side,
            uint256 price,
            uint256 quantity
        ) external returns (uint256 orderId);

        function changeOrder(
            address market,
            uint256 orderId,
            uint256 newPrice,
            uint256 newQuantity
        ) external;

        function claimOrder(address market, uint256[] calldata orderIds) external;

        function cancelOrder(address market, uint256[] calldata orderIds) external;

        event OrderPlaced(address indexed market, uint256 indexed orderId, address indexed trader, uint8 side, uint256 price, uint256 quantity);
        event OrderChanged(address indexed market, uint256 indexed orderId, uint256 newPrice, uint256 newQuantity);
        event OrderClaimed(address indexed market, uint256[] orderIds);
        event OrderCanceled(address indexed market, uint256[] orderIds);
    }
}

/// Encode an `OrderIntent` into the calldata for its corresponding
/// `ICentralLimitOrderBook` call.
pub fn encode_calldata(intent: &OrderIntent) -> Bytes {
    match intent {
        OrderIntent::Place { market, side, price, quantity, .. } => {
            let call = ICentralLimitOrderBook::placeOrderCall {
                market: *market,
                side: match side {
                    OrderSide::Bid => 0,
                    OrderSide::Ask => 1,
                },
                price: *price,
                quantity: *quantity,
            };
            Bytes::from(call.abi_encode())
        }
        OrderIntent::Change { market, order_id, new_price, new_quantity } => {
            let call = ICentralLimitOrderBook::changeOrderCall {
                market: *market,
                orderId: alloy::primitives::U256::from(*order_id),
                newPrice: *new_price,
                newQuantity: *new_quantity,
            };
            Bytes::from(call.abi_encode())
        }
        OrderIntent::Claim { market, order_ids } => {
            let call = ICentralLimitOrderBook::claimOrderCall {
                market: *market,
                orderIds: order_ids.iter().map(|id| alloy::primitives::U256::from(*id)).collect(),
            };
            Bytes::from(call.abi_encode())
        }
        OrderIntent::Cancel { market, order_ids } => {
            let call = ICentralLimitOrderBook::cancelOrderCall {
                market: *market,
                orderIds: order_ids.iter().map(|id| alloy::primitives::U256::from(*id)).collect(),
            };
            Bytes::from(call.abi_encode())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::SolCall;

    #[test]
    fn place_order_call_encodes_selector_and_args() {
        let call = ICentralLimitOrderBook::placeOrderCall {
            market: Address::repeat_byte(0x11),
            side: 0,
            price: U256::from(100u64),
            quantity: U256::from(5u64),
        };
        let encoded = call.abi_encode();
        assert!(encoded.len() > 4);
    }

    #[test]
    fn cancel_order_call_encodes_order_id_array() {
        let call = ICentralLimitOrderBook::cancelOrderCall {
            market: Address::repeat_byte(0x22),
            orderIds: vec![U256::from(1u64), U256::from(2u64)],
        };
        let encoded = call.abi_encode();
        assert!(encoded.len() > 4);
    }

    #[test]
    fn encode_calldata_place_matches_direct_call_encoding() {
        let intent = OrderIntent::Place {
            market: Address::repeat_byte(0x33),
            side: OrderSide::Ask,
            price: U256::from(200u64),
            quantity: U256::from(3u64),
            order_id_hint: None,
        };
        let via_intent = encode_calldata(&intent);
        let direct = ICentralLimitOrderBook::placeOrderCall {
            market: Address::repeat_byte(0x33),
            side: 1,
            price: U256::from(200u64),
            quantity: U256::from(3u64),
        }
        .abi_encode();
        assert_eq!(via_intent.as_ref(), direct.as_slice());
    }

    #[test]
    fn encode_calldata_cancel_carries_all_order_ids() {
        let intent = OrderIntent::Cancel { market: Address::repeat_byte(0x44), order_ids: vec![7, 8, 9] };
        let calldata = encode_calldata(&intent);
        assert!(calldata.len() > 4);
    }
}
