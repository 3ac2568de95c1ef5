use crate::storage::{PhoneNumberStore, StoreConfig, StoreError, PHONE_NUMBER_CAPACITY};
use crate::tests::mock::{MockStore, StoreFault};

fn load(store: MockStore) -> PhoneNumberStore<MockStore> {
    PhoneNumberStore::load(store, StoreConfig::default())
}

#[test]
fn test_load_erased_memory() {
    assert_eq!(None, load(MockStore::erased()).phone_number());
}

#[test]
fn test_load_zeroed_memory() {
    assert_eq!(None, load(MockStore::filled(0x0)).phone_number());
}

#[test]
fn test_load_length_exceeding_max() {
    let store = MockStore::with_record(600, &[21, b'1', b'2', b'3']);
    assert_eq!(None, load(store).phone_number());
}

#[test]
fn test_load_stored_number() {
    let store = MockStore::with_record(600, b"\x0B15551234567");
    assert_eq!(Some("15551234567"), load(store).phone_number());
}

#[test]
fn test_load_invalid_text() {
    let store = MockStore::with_record(600, &[3, b'1', 0xFF, b'3']);
    assert_eq!(None, load(store).phone_number());
}

#[test]
fn test_load_read_error() {
    let mut store = MockStore::with_record(600, b"\x0B15551234567");
    store.fail_reads = true;

    assert_eq!(None, load(store).phone_number());
}

#[test]
fn test_save_record_layout() {
    let mut numbers = load(MockStore::erased());
    numbers.save("+4917012345").unwrap();

    let store = numbers.release();
    assert_eq!(11, store.memory[600]);
    assert_eq!(b"+4917012345", &store.memory[601..612]);
    assert_eq!([0x0; 9], store.memory[612..621]);

    // Nothing written beyond the record
    assert_eq!(0xFF, store.memory[599]);
    assert_eq!(0xFF, store.memory[621]);
    assert_eq!(21, store.writes);
    assert_eq!(1, store.commits);
}

#[test]
fn test_save_round_trip() {
    let mut numbers = load(MockStore::erased());
    numbers.save("15551234567").unwrap();
    assert_eq!(Some("15551234567"), numbers.phone_number());

    let numbers = load(numbers.release());
    assert_eq!(Some("15551234567"), numbers.phone_number());
}

#[test]
fn test_save_truncated() {
    let mut numbers = load(MockStore::erased());
    numbers.save("1234567890123456789012345").unwrap();
    assert_eq!(Some("12345678901234567890"), numbers.phone_number());

    let numbers = load(numbers.release());
    assert_eq!(Some("12345678901234567890"), numbers.phone_number());
}

#[test]
fn test_save_truncated_at_char_boundary() {
    let mut numbers = load(MockStore::erased());

    // 21 bytes, cutting at 20 would split the last char
    numbers.save("1234567890123456789ü").unwrap();
    assert_eq!(Some("1234567890123456789"), numbers.phone_number());
}

#[test]
fn test_save_shorter_number_overwrites_longer() {
    let mut numbers = load(MockStore::erased());
    numbers.save("15551234567").unwrap();
    numbers.save("112").unwrap();

    let numbers = load(numbers.release());
    assert_eq!(Some("112"), numbers.phone_number());
}

#[test]
fn test_save_write_error() {
    let mut numbers = load(MockStore::erased());
    numbers.save("15551234567").unwrap();

    let mut store = numbers.release();
    store.fail_writes = true;
    let mut numbers = load(store);

    assert_eq!(Err(StoreError::Storage(StoreFault)), numbers.save("112"));
    assert_eq!(Some("15551234567"), numbers.phone_number());
}

#[test]
fn test_set_valid_number() {
    let mut numbers = load(MockStore::erased());
    numbers.set("+15551234567").unwrap();
    assert_eq!(Some("+15551234567"), numbers.phone_number());
}

#[test]
fn test_set_empty_rejected() {
    let mut numbers = load(MockStore::with_record(600, b"\x0B15551234567"));

    assert_eq!(Err(StoreError::InvalidLength), numbers.set(""));
    assert_eq!(Some("15551234567"), numbers.phone_number());
    assert_eq!(0, numbers.release().writes);
}

#[test]
fn test_set_too_long_rejected() {
    let mut numbers = load(MockStore::with_record(600, b"\x0B15551234567"));

    assert_eq!(Err(StoreError::InvalidLength), numbers.set("123456789012345678901"));
    assert_eq!(Some("15551234567"), numbers.phone_number());

    let store = numbers.release();
    assert_eq!(0, store.writes);
    assert_eq!(0, store.commits);
}

#[test]
fn test_set_max_length() {
    let mut numbers = load(MockStore::erased());
    numbers.set("12345678901234567890").unwrap();
    assert_eq!(Some("12345678901234567890"), numbers.phone_number());
}

#[test]
fn test_clear() {
    let mut numbers = load(MockStore::erased());
    numbers.set("15551234567").unwrap();
    numbers.clear().unwrap();
    assert_eq!(None, numbers.phone_number());

    let store = numbers.release();
    assert_eq!(0, store.memory[600]);

    assert_eq!(None, load(store).phone_number());
}

#[test]
fn test_custom_location() {
    let config = StoreConfig::new(0, 8);
    let mut numbers = PhoneNumberStore::load(MockStore::erased(), config);

    numbers.save("0123456789").unwrap();
    assert_eq!(Some("01234567"), numbers.phone_number());

    let store = numbers.release();
    assert_eq!(b"\x0801234567", &store.memory[..9]);
    assert_eq!(0xFF, store.memory[9]);
}

#[test]
fn test_config_max_len_limited_to_capacity() {
    assert_eq!(PHONE_NUMBER_CAPACITY, StoreConfig::new(0, 100).max_len);

    // Limit is applied to configs built without new() as well
    let config = StoreConfig {
        base_address: 0,
        max_len: 100,
    };
    let numbers = PhoneNumberStore::load(MockStore::erased(), config);
    assert_eq!(PHONE_NUMBER_CAPACITY, numbers.config().max_len);
}
