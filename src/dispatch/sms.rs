use anyhow::{Result, bail};

/// Build an SMS-gateway email address from a gateway template and a phone
/// number.
///
/// The template contains `#` placeholders which are filled right-to-left
/// with the trailing digits of the phone number, all other characters are
/// kept as-is:
///
/// ```
/// # use alertmail::dispatch::sms_email_address;
/// let addr = sms_email_address("0#####@sms.example.com", "+49 (0) 123 456").unwrap();
/// assert_eq!(addr, "023456@sms.example.com");
/// ```
pub fn sms_email_address(gateway: &str, phone: &str) -> Result<String> {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    let mut out: Vec<char> = gateway.chars().collect();

    let mut next = digits.len();
    for slot in out.iter_mut().rev() {
        if *slot != '#' {
            continue;
        }
        if next == 0 {
            bail!("phone number '{phone}' has too few digits for gateway template '{gateway}'");
        }
        next -= 1;
        *slot = digits[next];
    }

    Ok(out.into_iter().collect())
}
