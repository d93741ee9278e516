use asymcrypt::{Algorithm, CryptoConfig, CryptoError, Dispatcher, Request};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;

/// Key generation dominates test time, so every test shares one dispatcher.
static DISPATCHER: Lazy<Dispatcher> = Lazy::new(|| {
    let config = CryptoConfig {
        rsa_bits: 1024,
        elgamal_bits: 512,
        ..CryptoConfig::default()
    };
    Dispatcher::generate(&config).unwrap()
});

fn messages() -> Vec<String> {
    vec![
        String::new(),
        "Hello!".to_string(),
        "Nhiều khối: ".to_string() + &"xin chào thế giới 🌏 ".repeat(12),
    ]
}

#[test]
fn test_round_trip_all_algorithms() {
    for alg in Algorithm::ALL {
        for message in messages() {
            let ciphertext = DISPATCHER.encrypt(alg, &message).unwrap();
            assert_eq!(DISPATCHER.decrypt(alg, &ciphertext).unwrap(), message, "{}", alg);
        }
    }
}

#[test]
fn test_hello_elgamal() {
    let message = "Hello, ElGamal!";
    let ciphertext = DISPATCHER.encrypt(Algorithm::ElGamal, message).unwrap();
    assert_eq!(DISPATCHER.decrypt(Algorithm::ElGamal, &ciphertext).unwrap(), message);

    let signature = DISPATCHER.sign(Algorithm::ElGamal, message).unwrap();
    assert!(DISPATCHER.verify(Algorithm::ElGamal, message, &signature).unwrap());
    assert!(!DISPATCHER.verify(Algorithm::ElGamal, "Hello, Elgamal!", &signature).unwrap());
}

#[test]
fn test_sign_verify_all_algorithms() {
    for alg in Algorithm::ALL {
        for message in messages() {
            let signature = DISPATCHER.sign(alg, &message).unwrap();
            assert!(DISPATCHER.verify(alg, &message, &signature).unwrap(), "{}", alg);
        }
    }
}

#[test]
fn test_flipped_message_bit_fails_verification() {
    let message = "transfer 100 coins";
    // 'c' ^ 0x01 = 'b'
    let flipped = "transfer 100 boins";
    for alg in Algorithm::ALL {
        let signature = DISPATCHER.sign(alg, message).unwrap();
        assert!(!DISPATCHER.verify(alg, flipped, &signature).unwrap(), "{}", alg);
    }
}

#[test]
fn test_swapped_signature_fields_fail_verification() {
    let message = "swap";

    let signature = DISPATCHER.sign(Algorithm::ElGamal, message).unwrap();
    let (r, s) = signature.split_once(',').unwrap();
    assert!(!DISPATCHER.verify(Algorithm::ElGamal, message, &format!("{},{}", s, r)).unwrap());

    let signature = DISPATCHER.sign(Algorithm::Ecc, message).unwrap();
    let (r, s) = signature.split_once('|').unwrap();
    assert!(!DISPATCHER.verify(Algorithm::Ecc, message, &format!("{}|{}", s, r)).unwrap());

    // The RSA signature is one field; swap its two halves instead
    let signature = DISPATCHER.sign(Algorithm::Rsa, message).unwrap();
    let bytes = STANDARD.decode(&signature).unwrap();
    let (head, tail) = bytes.split_at(bytes.len() / 2);
    let swapped = STANDARD.encode([tail, head].concat());
    assert!(!DISPATCHER.verify(Algorithm::Rsa, message, &swapped).unwrap());
}

#[test]
fn test_wrong_delimiter_count_is_invalid_format() {
    let cases = [
        (Algorithm::ElGamal, "ab,cd,ef"),
        (Algorithm::ElGamal, "abcd"),
        (Algorithm::Ecc, "1|2|3"),
        (Algorithm::Ecc, "1|2|3|4|5|6"),
        (Algorithm::Rsa, "not-base64!"),
    ];
    for (alg, ciphertext) in cases {
        assert!(
            matches!(
                DISPATCHER.decrypt(alg, ciphertext),
                Err(CryptoError::InvalidFormat(_))
            ),
            "{} {:?}",
            alg,
            ciphertext
        );
    }

    assert!(matches!(
        DISPATCHER.verify(Algorithm::ElGamal, "m", "a,b,c"),
        Err(CryptoError::InvalidFormat(_))
    ));
    assert!(matches!(
        DISPATCHER.verify(Algorithm::Ecc, "m", "a"),
        Err(CryptoError::InvalidFormat(_))
    ));
}

#[test]
fn test_ciphertexts_do_not_cross_algorithms() {
    let ciphertext = DISPATCHER.encrypt(Algorithm::ElGamal, "scoped").unwrap();
    assert!(DISPATCHER.decrypt(Algorithm::Ecc, &ciphertext).is_err());
    assert!(DISPATCHER.decrypt(Algorithm::Rsa, &ciphertext).is_err());
}

#[test]
fn test_rsa_private_exponent_inverts_public() {
    let keys = DISPATCHER.rsa().keys();
    let ed = &keys.public.e * keys.private().d();
    assert_eq!(ed % keys.phi(), num_bigint::BigInt::from(1));
}

#[test]
fn test_concurrent_use() {
    std::thread::scope(|scope| {
        for alg in Algorithm::ALL {
            scope.spawn(move || {
                for i in 0..3 {
                    let message = format!("{} worker message {}", alg, i);
                    let ciphertext = DISPATCHER.encrypt(alg, &message).unwrap();
                    assert_eq!(DISPATCHER.decrypt(alg, &ciphertext).unwrap(), message);
                    let signature = DISPATCHER.sign(alg, &message).unwrap();
                    assert!(DISPATCHER.verify(alg, &message, &signature).unwrap());
                }
            });
        }
    });
}

#[test]
fn test_handle_requests() {
    let response = DISPATCHER.handle(&Request::Sign {
        algorithm: "ecc".into(),
        message: "via request".into(),
    });
    assert!(response.ok);
    let signature = response.result.unwrap().as_str().unwrap().to_string();

    let response = DISPATCHER.handle(&Request::Verify {
        algorithm: "ECC".into(),
        message: "via request".into(),
        signature,
    });
    assert_eq!(response.result, Some(serde_json::Value::Bool(true)));

    let response = DISPATCHER.handle(&Request::Encrypt {
        algorithm: "DES".into(),
        message: "nope".into(),
    });
    assert!(!response.ok);
    assert_eq!(response.error.as_deref(), Some("unsupported_algorithm"));

    let response = DISPATCHER.handle(&Request::Decrypt {
        algorithm: "RSA".into(),
        ciphertext: "%%%".into(),
    });
    assert_eq!(response.error.as_deref(), Some("invalid_format"));
}

#[test]
fn test_generate_rejects_invalid_config() {
    let config = CryptoConfig {
        miller_rabin_rounds: 3,
        ..CryptoConfig::default()
    };
    assert!(matches!(
        Dispatcher::generate(&config),
        Err(CryptoError::Config(_))
    ));
}
