use vestige_pubkey::Pubkey;

/// `2RuBcnnCXuY7VXxCKXShXw2T5rsGc8xnV6yvdsMwjCoF`
pub const VESTIGE_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    21, 60, 161, 65, 199, 86, 224, 220, 134, 153, 81, 66, 31, 254, 235, 136, 80, 105, 81, 160,
    244, 34, 40, 150, 140, 184, 191, 115, 164, 155, 210, 246,
]);

/// `DELeGGvXpWV2fqJUhqcF5ZSYMS4JTLjteaAMARRSaeSh`
///
/// Owns an account on the base ledger for as long as it is delegated.
pub const DELEGATION_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    181, 183, 0, 225, 242, 87, 58, 192, 204, 6, 34, 1, 52, 74, 207, 151, 184, 53, 6, 235, 140,
    229, 25, 152, 204, 98, 126, 24, 147, 128, 167, 62,
]);

/// `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);
