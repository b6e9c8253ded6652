use alloy::sol;

// ─── cToken Market Interface ────────────────────────────────────────────────
sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract CToken {
        // === Market activity events ===
        event Mint(address minter, uint256 mintAmount, uint256 mintTokens);
        event Redeem(address redeemer, uint256 redeemAmount, uint256 redeemTokens);
        event Borrow(
            address borrower,
            uint256 borrowAmount,
            uint256 accountBorrows,
            uint256 totalBorrows
        );
        event RepayBorrow(
            address payer,
            address borrower,
            uint256 repayAmount,
            uint256 accountBorrows,
            uint256 totalBorrows
        );
        event LiquidateBorrow(
            address liquidator,
            address borrower,
            uint256 repayAmount,
            address cTokenCollateral,
            uint256 seizeTokens
        );

        // === ERC-20 receipt-token events ===
        event Transfer(address indexed from, address indexed to, uint256 amount);
        event Approval(address indexed owner, address indexed spender, uint256 amount);

        // === Interest accrual (not mapped, listed for signature matching) ===
        event AccrueInterest(
            uint256 cashPrior,
            uint256 interestAccumulated,
            uint256 borrowIndex,
            uint256 totalBorrows
        );

        // === View functions used for market metadata ===
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external pure returns (uint8);
        function underlying() external view returns (address);
        function exchangeRateStored() external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }
}
