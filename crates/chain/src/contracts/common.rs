//! Common contract interfaces shared across markets.

use alloy::primitives::B256;
use alloy::sol;

sol! {
    /// Standard ERC20 interface (subset needed for balance/allowance checks).
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

/// Event signature constants for common ERC20 events.
pub mod common_signatures {
    use super::*;

    /// keccak256("Transfer(address,address,uint256)")
    pub const ERC20_TRANSFER: B256 = B256::new([
        0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d,
        0xaa, 0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23,
        0xb3, 0xef,
    ]);

    /// keccak256("Approval(address,address,uint256)")
    pub const ERC20_APPROVAL: B256 = B256::new([
        0x8c, 0x5b, 0xe1, 0xe5, 0xeb, 0xec, 0x7d, 0x5b, 0xd1, 0x4f, 0x71, 0x42, 0x7d, 0x1e, 0x84,
        0xf3, 0xdd, 0x03, 0x14, 0xc0, 0xf7, 0xb2, 0x29, 0x1e, 0x5b, 0x20, 0x0a, 0xc8, 0xc7, 0xc3,
        0xb9, 0x25,
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_signatures_are_nonzero() {
        assert!(!common_signatures::ERC20_TRANSFER.is_zero());
        assert!(!common_signatures::ERC20_APPROVAL.is_zero());
    }
}
