//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chain_evm::address::{address_from_private_key, checksum};
use chain_evm::receipt::TransactionReceipt;
use chain_evm::{Address, U256};
use evm_adapter::{
    Account, AdapterConfig, BlockTag, CallMsg, ChainClient, DynAbiCodec, EvmAdapter, MemoryWalletStore,
    PipelineContext, RpcError, SmartContract,
};
use keystore::{KdfParams, LocalKeyStore};
use secrecy::SecretString;
use sha3::{Digest, Keccak256};

pub const APP: &str = "app";
pub const WALLET: &str = "wallet-1";
pub const CHAIN_ID: u64 = 1337;
pub const GWEI: u64 = 1_000_000_000;
pub const PASSWORD: &str = "correct horse battery staple";

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

#[derive(Default)]
struct MockState {
    chain_id: u64,
    balances: HashMap<Address, U256>,
    tokens: HashMap<(Address, Address), U256>,
    nonces: HashMap<Address, u64>,
    gas_price: U256,
    gas_limit: u64,
    estimate_error: Option<String>,
    broadcast_error: Option<String>,
    unavailable: HashSet<Address>,
    delay: Option<Duration>,
    broadcasts: Vec<Vec<u8>>,
    estimates: Vec<CallMsg>,
    code: HashSet<Address>,
    call_results: HashMap<Address, Vec<u8>>,
    receipts: HashMap<String, TransactionReceipt>,
}

/// In-memory chain. Token balances answer `balanceOf` calls; everything
/// else is set directly.
pub struct MockChainClient {
    state: Mutex<MockState>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                chain_id: CHAIN_ID,
                gas_price: U256::from(20 * GWEI),
                gas_limit: 21_000,
                ..Default::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_balance(&self, address: &str, wei: U256) {
        let address = parse(address);
        self.with(|s| s.balances.insert(address, wei));
    }

    pub fn set_token_balance(&self, contract: &str, owner: &str, raw: U256) {
        let key = (parse(contract), parse(owner));
        self.with(|s| s.tokens.insert(key, raw));
    }

    pub fn set_nonce(&self, address: &str, nonce: u64) {
        let address = parse(address);
        self.with(|s| s.nonces.insert(address, nonce));
    }

    pub fn set_gas(&self, price: U256, limit: u64) {
        self.with(|s| {
            s.gas_price = price;
            s.gas_limit = limit;
        });
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.with(|s| s.chain_id = chain_id);
    }

    pub fn fail_estimate(&self, reason: &str) {
        self.with(|s| s.estimate_error = Some(reason.to_string()));
    }

    pub fn reject_broadcast(&self, reason: &str) {
        self.with(|s| s.broadcast_error = Some(reason.to_string()));
    }

    /// Balance and nonce lookups for `address` fail at the transport level.
    pub fn make_unavailable(&self, address: &str) {
        let address = parse(address);
        self.with(|s| s.unavailable.insert(address));
    }

    pub fn set_delay(&self, delay: Duration) {
        self.with(|s| s.delay = Some(delay));
    }

    pub fn set_code(&self, address: &str) {
        let address = parse(address);
        self.with(|s| s.code.insert(address));
    }

    pub fn set_call_result(&self, contract: &str, output: Vec<u8>) {
        let contract = parse(contract);
        self.with(|s| s.call_results.insert(contract, output));
    }

    pub fn set_receipt(&self, tx_hash: &str, receipt: TransactionReceipt) {
        self.with(|s| s.receipts.insert(tx_hash.to_string(), receipt));
    }

    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.with(|s| s.broadcasts.clone())
    }

    pub fn estimates(&self) -> Vec<CallMsg> {
        self.with(|s| s.estimates.clone())
    }

    async fn pause(&self) {
        let delay = self.with(|s| s.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_available(&self, address: &Address) -> Result<(), RpcError> {
        if self.with(|s| s.unavailable.contains(address)) {
            return Err(RpcError::Transport("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.pause().await;
        Ok(self.with(|s| s.chain_id))
    }

    async fn get_balance(&self, address: Address) -> Result<U256, RpcError> {
        self.pause().await;
        self.check_available(&address)?;
        Ok(self.with(|s| s.balances.get(&address).copied().unwrap_or_default()))
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, RpcError> {
        self.pause().await;
        self.check_available(&address)?;
        Ok(self.with(|s| s.nonces.get(&address).copied().unwrap_or_default()))
    }

    async fn estimate_gas(&self, call: &CallMsg) -> Result<u64, RpcError> {
        self.pause().await;
        self.with(|s| {
            s.estimates.push(call.clone());
            match &s.estimate_error {
                Some(reason) => Err(RpcError::Node {
                    code: 3,
                    message: reason.clone(),
                }),
                None => Ok(s.gas_limit),
            }
        })
    }

    async fn gas_price(&self) -> Result<U256, RpcError> {
        self.pause().await;
        Ok(self.with(|s| s.gas_price))
    }

    async fn call(&self, call: &CallMsg, _block: BlockTag) -> Result<Vec<u8>, RpcError> {
        self.pause().await;
        self.with(|s| {
            if call.data.len() == 36 && call.data[..4] == BALANCE_OF_SELECTOR {
                let owner = Address::from_slice(&call.data[16..36]);
                let balance = s.tokens.get(&(call.to, owner)).copied().unwrap_or_default();
                return Ok(balance.to_be_bytes::<32>().to_vec());
            }
            s.call_results.get(&call.to).cloned().ok_or(RpcError::Node {
                code: 3,
                message: "execution reverted".into(),
            })
        })
    }

    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, RpcError> {
        self.pause().await;
        self.with(|s| {
            if let Some(reason) = &s.broadcast_error {
                return Err(RpcError::Node {
                    code: -32000,
                    message: reason.clone(),
                });
            }
            s.broadcasts.push(raw_tx.to_vec());
            Ok(format!("0x{}", hex::encode(Keccak256::digest(raw_tx))))
        })
    }

    async fn is_contract(&self, address: Address) -> Result<bool, RpcError> {
        self.pause().await;
        Ok(self.with(|s| s.code.contains(&address)))
    }

    async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, RpcError> {
        self.pause().await;
        Ok(self.with(|s| s.receipts.get(tx_hash).cloned()))
    }
}

fn parse(address: &str) -> Address {
    chain_evm::address::parse_address(address).unwrap()
}

/// Private key `n` (big-endian, non-zero).
pub fn key(n: u8) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[31] = n;
    key
}

/// EIP-55 address of private key `n`.
pub fn addr(n: u8) -> String {
    checksum(&address_from_private_key(&key(n)).unwrap())
}

pub fn password() -> SecretString {
    SecretString::from(PASSWORD.to_string())
}

pub fn eth(amount: &str) -> U256 {
    chain_evm::Amount::parse(amount, 18).unwrap().raw()
}

pub fn usdt() -> SmartContract {
    SmartContract {
        address: "0xdAC17F958D2ee523a2206206994597C13D831ec7".into(),
        symbol: "ETH".into(),
        name: "Tether USD".into(),
        token: "USDT".into(),
        decimals: 6,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub adapter: EvmAdapter,
    pub client: Arc<MockChainClient>,
    pub keys: Arc<LocalKeyStore>,
    pub wallets: Arc<MemoryWalletStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AdapterConfig::new("ETH", CHAIN_ID, "http://127.0.0.1:8545"))
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        init_tracing();
        let client = Arc::new(MockChainClient::new());
        let keys = Arc::new(LocalKeyStore::new(KdfParams::light()));
        let wallets = Arc::new(MemoryWalletStore::new());
        let ctx = PipelineContext::new(
            config,
            client.clone(),
            Arc::new(DynAbiCodec::new()),
            keys.clone(),
            wallets.clone(),
        );
        Self {
            adapter: EvmAdapter::new(ctx),
            client,
            keys,
            wallets,
        }
    }

    /// Registers a single-signature account whose addresses are the keys
    /// `key_ids`, importing each key under `account_id`.
    pub fn single_account(&self, account_id: &str, key_ids: &[u8]) -> Account {
        let account = Account::single(WALLET, account_id, key_ids.iter().map(|&n| addr(n)).collect());
        self.register(account, key_ids)
    }

    /// Registers a multi-signature account sending from key `from` with
    /// co-signers `owners`.
    pub fn multisig_account(&self, account_id: &str, from: u8, owners: &[u8], required: u8) -> Account {
        let account = Account::multisig(
            WALLET,
            account_id,
            vec![addr(from)],
            owners.iter().map(|&n| addr(n)).collect(),
            required,
        );
        let mut key_ids = vec![from];
        key_ids.extend_from_slice(owners);
        self.register(account, &key_ids)
    }

    fn register(&self, account: Account, key_ids: &[u8]) -> Account {
        for &n in key_ids {
            self.keys.import_key(&account.account_id, &key(n), &password()).unwrap();
        }
        self.wallets.insert(APP, account.clone()).unwrap();
        account
    }
}
