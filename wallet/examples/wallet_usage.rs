use byron_core::{Coin, Encode, NetworkConfig, TxId, TxOut, TxoPointer};
use byron_wallet::{
    generate_entropy, mnemonic_from_entropy, AddressChain, TransactionBuilder,
    TransactionFinalized, Wallet,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Byron Wallet Example ===\n");

    let config = NetworkConfig::testnet();

    // Fresh 15-word wallet
    let entropy = generate_entropy(15)?;
    println!("Mnemonic: {}\n", mnemonic_from_entropy(&entropy));

    let mut wallet = Wallet::from_config(&entropy, b"", &config);
    let account = wallet.create_account("default", 0);

    let receive = account.generate_addresses(AddressChain::External, 0, 3)?;
    let change = account.generate_addresses(AddressChain::Internal, 0, 1)?;
    for (i, address) in receive.iter().enumerate() {
        println!("  receive/{}: {}", i, address);
    }
    println!("  change/0:  {}\n", change[0]);

    // Pretend receive/0 holds 10 ADA
    let utxo = TxoPointer::new(TxId::new([0x42; 32]), 0);
    let mut builder = TransactionBuilder::new(config.fee);
    builder.add_input(&utxo, 10_000_000)?;
    builder.add_output(TxOut::new(receive[1].clone(), Coin::new(2_500_000)?));
    let change_value = builder.add_change_output(&change[0])?;
    println!("Fee: {} ADA", builder.compute_fee()?);
    if let Some(value) = change_value {
        println!("Change: {} ADA", value);
    }

    let mut finalized = TransactionFinalized::new(builder.finalize()?);
    let txid = finalized.id();
    let key = account.address_xprv(AddressChain::External, 0)?;
    finalized.add_witness(&key, config.protocol_magic, &txid)?;

    let signed = finalized.output()?;
    println!("\nTransaction {}", txid);
    println!("  Valid signatures: {}", signed.verify(config.protocol_magic));
    println!("  Encoded size: {} bytes", signed.to_cbor().len());

    Ok(())
}
