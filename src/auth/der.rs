use crate::error::{AppError, Result};

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;

// 1.2.840.113549.1.1.1
const RSA_ENCRYPTION_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];

/// RSA private key components as big-endian unsigned integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeyMaterial {
    pub modulus: Vec<u8>,
    pub public_exponent: Vec<u8>,
    pub private_exponent: Vec<u8>,
    pub prime_p: Vec<u8>,
    pub prime_q: Vec<u8>,
    pub exponent_dp: Vec<u8>,
    pub exponent_dq: Vec<u8>,
    pub coefficient_qinv: Vec<u8>,
}

impl RsaKeyMaterial {
    pub fn to_private_key(&self) -> Result<rsa::RsaPrivateKey> {
        use rsa::BigUint;

        rsa::RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&self.modulus),
            BigUint::from_bytes_be(&self.public_exponent),
            BigUint::from_bytes_be(&self.private_exponent),
            vec![
                BigUint::from_bytes_be(&self.prime_p),
                BigUint::from_bytes_be(&self.prime_q),
            ],
        )
        .map_err(|e| AppError::KeyFormat(format!("Invalid RSA key components: {}", e)))
    }
}

/// Sequential reader over DER tag-length-value triples.
struct DerReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| AppError::KeyFormat(format!("Unexpected end of data at {}", self.pos)))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_length(&mut self) -> Result<usize> {
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(first as usize);
        }

        let count = (first & 0x7f) as usize;
        if count == 0 || count > std::mem::size_of::<usize>() {
            return Err(AppError::KeyFormat(format!(
                "Unsupported length encoding 0x{:02x}",
                first
            )));
        }

        let mut length = 0usize;
        for _ in 0..count {
            length = (length << 8) | self.read_byte()? as usize;
        }
        Ok(length)
    }

    /// Read one element with the expected tag and return its contents.
    fn read_element(&mut self, tag: u8) -> Result<&'a [u8]> {
        let offset = self.pos;
        let found = self.read_byte()?;
        if found != tag {
            return Err(AppError::KeyFormat(format!(
                "Expected tag 0x{:02x} at offset {}, found 0x{:02x}",
                tag, offset, found
            )));
        }

        let length = self.read_length()?;
        let end = self
            .pos
            .checked_add(length)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                AppError::KeyFormat(format!(
                    "Element at offset {} overruns input ({} bytes)",
                    offset, length
                ))
            })?;

        let contents = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(contents)
    }

    fn read_nested(&mut self, tag: u8) -> Result<DerReader<'a>> {
        self.read_element(tag).map(DerReader::new)
    }

    fn read_integer(&mut self) -> Result<Vec<u8>> {
        let contents = self.read_element(TAG_INTEGER)?;
        match contents {
            [0x00, rest @ ..] if !rest.is_empty() => Ok(rest.to_vec()),
            _ => Ok(contents.to_vec()),
        }
    }
}

/// Decode a PKCS#8 `PrivateKeyInfo` holding an unencrypted RSA key.
pub fn decode_pkcs8_rsa(der: &[u8]) -> Result<RsaKeyMaterial> {
    let mut outer = DerReader::new(der).read_nested(TAG_SEQUENCE)?;
    outer.read_integer()?;

    let mut algorithm = outer.read_nested(TAG_SEQUENCE)?;
    let oid = algorithm.read_element(TAG_OID)?;
    if oid != RSA_ENCRYPTION_OID {
        return Err(AppError::KeyFormat(
            "Private key algorithm is not rsaEncryption".to_string(),
        ));
    }

    let mut key = outer
        .read_nested(TAG_OCTET_STRING)?
        .read_nested(TAG_SEQUENCE)?;

    // RSAPrivateKey version
    key.read_integer()?;

    Ok(RsaKeyMaterial {
        modulus: key.read_integer()?,
        public_exponent: key.read_integer()?,
        private_exponent: key.read_integer()?,
        prime_p: key.read_integer()?,
        prime_q: key.read_integer()?,
        exponent_dp: key.read_integer()?,
        exponent_dq: key.read_integer()?,
        coefficient_qinv: key.read_integer()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_helpers::test_key;
    use rsa::pkcs8::EncodePrivateKey;
    use rsa::traits::{PrivateKeyParts, PublicKeyParts};

    fn tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        match contents.len() {
            len if len < 0x80 => out.push(len as u8),
            len if len <= 0xff => out.extend([0x81, len as u8]),
            len => out.extend([0x82, (len >> 8) as u8, len as u8]),
        }
        out.extend_from_slice(contents);
        out
    }

    fn integer(bytes: &[u8]) -> Vec<u8> {
        tlv(TAG_INTEGER, bytes)
    }

    fn pkcs8(oid: &[u8], rsa_key: &[u8]) -> Vec<u8> {
        let mut algorithm = tlv(TAG_OID, oid);
        algorithm.extend([0x05, 0x00]);

        let mut info = integer(&[0x00]);
        info.extend(tlv(TAG_SEQUENCE, &algorithm));
        info.extend(tlv(TAG_OCTET_STRING, rsa_key));
        tlv(TAG_SEQUENCE, &info)
    }

    fn small_rsa_key() -> Vec<u8> {
        let mut fields = integer(&[0x00]);
        // n with a sign pad, the rest without
        fields.extend(integer(&[0x00, 0xc5, 0x01]));
        fields.extend(integer(&[0x01, 0x00, 0x01]));
        fields.extend(integer(&[0x00, 0x9f]));
        fields.extend(integer(&[0x0b]));
        fields.extend(integer(&[0x13]));
        fields.extend(integer(&[0x07]));
        fields.extend(integer(&[0x05]));
        fields.extend(integer(&[0x00]));
        tlv(TAG_SEQUENCE, &fields)
    }

    #[test]
    fn test_decode_hand_built_key() {
        let der = pkcs8(RSA_ENCRYPTION_OID, &small_rsa_key());
        let material = decode_pkcs8_rsa(&der).unwrap();

        assert_eq!(material.modulus, vec![0xc5, 0x01]);
        assert_eq!(material.public_exponent, vec![0x01, 0x00, 0x01]);
        assert_eq!(material.private_exponent, vec![0x9f]);
        assert_eq!(material.prime_p, vec![0x0b]);
        assert_eq!(material.prime_q, vec![0x13]);
        assert_eq!(material.exponent_dp, vec![0x07]);
        assert_eq!(material.exponent_dq, vec![0x05]);
        // A lone zero byte is the value zero, not a pad
        assert_eq!(material.coefficient_qinv, vec![0x00]);
    }

    #[test]
    fn test_decode_long_form_lengths() {
        let mut fields = integer(&[0x00]);
        let mut modulus = vec![0x00];
        modulus.extend(std::iter::repeat_n(0xab, 200));
        fields.extend(integer(&modulus));
        for _ in 0..7 {
            fields.extend(integer(&[0x03]));
        }
        let der = pkcs8(RSA_ENCRYPTION_OID, &tlv(TAG_SEQUENCE, &fields));
        assert_eq!(der[1], 0x81);

        let material = decode_pkcs8_rsa(&der).unwrap();
        assert_eq!(material.modulus.len(), 200);
        assert!(material.modulus.iter().all(|b| *b == 0xab));
        assert_eq!(material.coefficient_qinv, vec![0x03]);
    }

    #[test]
    fn test_decode_generated_key_round_trip() {
        let key = test_key();
        let der = key.to_pkcs8_der().unwrap();

        let material = decode_pkcs8_rsa(der.as_bytes()).unwrap();

        assert_eq!(material.modulus, key.n().to_bytes_be());
        assert_eq!(material.public_exponent, key.e().to_bytes_be());
        assert_eq!(material.private_exponent, key.d().to_bytes_be());
        assert_eq!(material.prime_p, key.primes()[0].to_bytes_be());
        assert_eq!(material.prime_q, key.primes()[1].to_bytes_be());
        assert_eq!(material.exponent_dp, key.dp().unwrap().to_bytes_be());
        assert_eq!(material.exponent_dq, key.dq().unwrap().to_bytes_be());
        assert_eq!(material.coefficient_qinv, key.qinv().unwrap().to_bytes_be().1);

        for field in [
            &material.modulus,
            &material.private_exponent,
            &material.prime_p,
            &material.prime_q,
        ] {
            assert_ne!(field[0], 0x00, "leading pad byte should be stripped");
        }

        let rebuilt = material.to_private_key().unwrap();
        assert_eq!(rebuilt.n(), key.n());
        assert_eq!(rebuilt.d(), key.d());
    }

    #[test]
    fn test_wrong_outer_tag() {
        let mut der = pkcs8(RSA_ENCRYPTION_OID, &small_rsa_key());
        der[0] = 0x31;
        let err = decode_pkcs8_rsa(&der).unwrap_err();
        assert!(matches!(err, AppError::KeyFormat(_)), "got {:?}", err);
    }

    #[test]
    fn test_missing_octet_string() {
        let mut algorithm = tlv(TAG_OID, RSA_ENCRYPTION_OID);
        algorithm.extend([0x05, 0x00]);
        let mut info = integer(&[0x00]);
        info.extend(tlv(TAG_SEQUENCE, &algorithm));
        // Bit string where the octet string should be
        info.extend(tlv(0x03, &small_rsa_key()));
        let der = tlv(TAG_SEQUENCE, &info);

        assert!(matches!(
            decode_pkcs8_rsa(&der),
            Err(AppError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_non_rsa_algorithm_rejected() {
        // 1.2.840.10045.2.1 (id-ecPublicKey)
        let ec_oid = [0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
        let der = pkcs8(&ec_oid, &small_rsa_key());

        let err = decode_pkcs8_rsa(&der).unwrap_err();
        assert!(err.to_string().contains("rsaEncryption"), "got {}", err);
    }

    #[test]
    fn test_truncated_input() {
        let der = pkcs8(RSA_ENCRYPTION_OID, &small_rsa_key());
        for len in [0, 1, 2, der.len() / 2, der.len() - 1] {
            assert!(
                matches!(decode_pkcs8_rsa(&der[..len]), Err(AppError::KeyFormat(_))),
                "truncated to {} bytes should fail",
                len
            );
        }
    }

    #[test]
    fn test_missing_integer_field() {
        let mut fields = integer(&[0x00]);
        for _ in 0..7 {
            fields.extend(integer(&[0x03]));
        }
        let der = pkcs8(RSA_ENCRYPTION_OID, &tlv(TAG_SEQUENCE, &fields));

        assert!(matches!(
            decode_pkcs8_rsa(&der),
            Err(AppError::KeyFormat(_))
        ));
    }
}
