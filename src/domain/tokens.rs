//! Well-known token contracts and address tags on Ethereum mainnet

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Stablecoin,
    Utility,
    Governance,
    Defi,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Stablecoin => "stablecoin",
            TokenType::Utility => "utility",
            TokenType::Governance => "governance",
            TokenType::Defi => "defi",
        }
    }

    fn blurb(&self) -> &'static str {
        match self {
            TokenType::Stablecoin => "a stablecoin pegged to the US Dollar",
            TokenType::Utility => "a utility token used for network operations",
            TokenType::Governance => "a governance token used for protocol voting",
            TokenType::Defi => "a DeFi protocol token",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenReference {
    pub address: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub kind: TokenType,
    pub decimals: u8,
}

const fn token(
    address: &'static str,
    symbol: &'static str,
    name: &'static str,
    kind: TokenType,
    decimals: u8,
) -> TokenReference {
    TokenReference {
        address,
        symbol,
        name,
        kind,
        decimals,
    }
}

pub const TOKENS: &[TokenReference] = &[
    token("0xdac17f958d2ee523a2206206994597c13d831ec7", "USDT", "Tether", TokenType::Stablecoin, 6),
    token("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "USDC", "USD Coin", TokenType::Stablecoin, 6),
    token("0x6b175474e89094c44da98b954eedeac495271d0f", "DAI", "Dai Stablecoin", TokenType::Stablecoin, 18),
    token("0x4fabb145d64652a948d72533023f6e7a623c7c53", "BUSD", "Binance USD", TokenType::Stablecoin, 18),
    token("0x8e870d67f660d95d5be530380d0ec0bd388289e1", "USDP", "Pax Dollar", TokenType::Stablecoin, 18),
    token("0x956f47f50a910163d8bf957cf5846d573e7f87ca", "FEI", "Fei USD", TokenType::Stablecoin, 18),
    token("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", "WETH", "Wrapped Ether", TokenType::Utility, 18),
    token("0x2260fac5e5542a773aa44fbcfedf7c193bc2c599", "WBTC", "Wrapped Bitcoin", TokenType::Utility, 8),
    token("0x7d1afa7b718fb893db30a3abc0cfc608aacfebb0", "MATIC", "Polygon", TokenType::Utility, 18),
    token("0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", "UNI", "Uniswap", TokenType::Governance, 18),
    token("0x514910771af9ca656af840dff83e8264ecf986ca", "LINK", "Chainlink", TokenType::Utility, 18),
    token("0x9f8f72aa9304c8b593d555f12ef6589cc3a579a2", "MKR", "Maker", TokenType::Governance, 18),
    token("0x6810e776880c02933d47db1b9fc05908e5386b96", "GNO", "Gnosis", TokenType::Utility, 18),
    token("0xc00e94cb662c3520282e6f5717214004a7f26888", "COMP", "Compound", TokenType::Governance, 18),
    token("0x0bc529c00c6401aef6d220be8c6ea1667f6ad93e", "YFI", "yearn.finance", TokenType::Defi, 18),
    token("0x7fc66500c84a76ad7e9c93437bfc5ac33e2ddae9", "AAVE", "Aave", TokenType::Defi, 18),
];

/// Contracts whose name tag is known without asking the explorer
pub const KNOWN_ADDRESS_TAGS: &[(&str, &str)] = &[
    ("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", "WETH Token"),
    ("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "USDC Token"),
    ("0xdac17f958d2ee523a2206206994597c13d831ec7", "USDT Token"),
    ("0x6b175474e89094c44da98b954eedeac495271d0f", "DAI Token"),
    ("0x7a250d5630b4cf539739df2c5dacb4c659f2488d", "Uniswap V2: Router"),
    ("0x7be8076f4ea4a4ad08075c2508e481d6c946d12b", "OpenSea: Wyvern Exchange"),
    ("0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45", "Uniswap V3: Router"),
    ("0xdef1c0ded9bec7f1a1670819833240f027b25eff", "0x: Exchange Proxy"),
    ("0xd9e1ce17f2641f24ae83637ab66a2cca9c378b9f", "SushiSwap: Router"),
    ("0x881d40237659c251811cec9c364ef91dc08d300c", "Metamask Swap Router"),
    ("0x000000000000ad05ccc4f10045630fb830b95127", "Blur.io: Exchange"),
    ("0x00000000006c3852cbef3e08e8df289169ede581", "Seaport 1.1"),
    ("0x95ad61b0a150d79219dcf64e1e6cc01f0b64c4ce", "SHIB Token"),
    ("0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", "UNI Token"),
    ("0x2260fac5e5542a773aa44fbcfedf7c193bc2c599", "WBTC Token"),
    ("0x514910771af9ca656af840dff83e8264ecf986ca", "LINK Token"),
];

pub fn find_token_by_address(address: &str) -> Option<&'static TokenReference> {
    let address = address.trim();
    TOKENS
        .iter()
        .find(|token| token.address.eq_ignore_ascii_case(address))
}

pub fn known_address_tag(address: &str) -> Option<&'static str> {
    let address = address.trim();
    KNOWN_ADDRESS_TAGS
        .iter()
        .find(|(addr, _)| addr.eq_ignore_ascii_case(address))
        .map(|(_, tag)| *tag)
}

impl TokenReference {
    pub fn describe(&self) -> String {
        format!(
            "{} ({}) is {} on Ethereum.",
            self.name,
            self.symbol,
            self.kind.blurb()
        )
    }
}

/// One line per token, used as reference material in completion prompts
pub fn reference_table() -> String {
    TOKENS
        .iter()
        .map(|t| format!("{}: {} {} decimals.", t.address, t.describe(), t.decimals))
        .collect::<Vec<_>>()
        .join("\n")
}
