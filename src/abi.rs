use alloy::sol;

sol! {
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
    }

    interface IOwnable {
        function owner() external view returns (address);
        function getOwner() external view returns (address);
        function renounceOwnership() external;
        function transferOwnership(address newOwner) external;
    }

    interface IUniswapV2Pair {
        event Sync(uint112 reserve0, uint112 reserve1);
        event Mint(address indexed sender, uint256 amount0, uint256 amount1);
        event Burn(address indexed sender, uint256 amount0, uint256 amount1, address indexed to);
        event Swap(
            address indexed sender,
            uint256 amount0In,
            uint256 amount1In,
            uint256 amount0Out,
            uint256 amount1Out,
            address indexed to
        );

        function token0() external view returns (address);
        function token1() external view returns (address);
    }

    interface IUniswapV2Factory {
        event PairCreated(address indexed token0, address indexed token1, address pair, uint256 allPairsLength);
    }

    interface ITeamFinanceLock {
        event Deposit(
            uint256 id,
            address indexed tokenAddress,
            address indexed withdrawalAddress,
            uint256 amount,
            uint256 unlockTime
        );
    }

    interface IUnicryptLocker {
        event onDeposit(address lpToken, address user, uint256 amount, uint256 lockDate, uint256 unlockDate);
    }
}
