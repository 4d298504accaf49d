// server/src/services/email/templates.rs

use super::EmailMessage;
use crate::models::money::format_cents;
use crate::models::order::CustomerInfo;

/// A purchased line as shown in order emails.
#[derive(Debug, Clone)]
pub struct EmailLine {
  pub name: String,
  pub quantity: i64,
  pub unit_price_cents: i64,
}

fn escape(raw: &str) -> String {
  raw
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

fn order_body(order_id: i64, customer: &CustomerInfo, lines: &[EmailLine], total_cents: i64) -> String {
  let rows: String = lines
    .iter()
    .map(|l| {
      format!(
        "<tr><td>{}</td><td>{}</td><td>{} TL</td><td>{} TL</td></tr>",
        escape(&l.name),
        l.quantity,
        format_cents(l.unit_price_cents),
        format_cents(l.unit_price_cents.saturating_mul(l.quantity))
      )
    })
    .collect();
  let note = customer.note.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or("Belirtilmemiş");

  format!(
    "<h2>Sipariş #{id}</h2>\
     <table><tr><th>Ürün</th><th>Adet</th><th>Birim</th><th>Tutar</th></tr>{rows}</table>\
     <p><strong>Toplam: {total} TL</strong></p>\
     <p>Ad Soyad: {name}<br>E-posta: {email}<br>Telefon: {phone}<br>Adres: {address}</p>\
     <p>Müşteri Notu: {note}</p>",
    id = order_id,
    rows = rows,
    total = format_cents(total_cents),
    name = escape(&customer.full_name()),
    email = escape(&customer.email),
    phone = escape(&customer.phone),
    address = escape(&customer.address),
    note = escape(note),
  )
}

pub fn order_confirmation(order_id: i64, customer: &CustomerInfo, lines: &[EmailLine], total_cents: i64) -> EmailMessage {
  EmailMessage {
    to: customer.email.clone(),
    subject: format!("Sipariş Onayı #{}", order_id),
    html_body: format!(
      "<p>Merhaba {},</p><p>Siparişiniz başarıyla alınmıştır.</p>{}<p>Teşekkür ederiz!</p>",
      escape(&customer.full_name()),
      order_body(order_id, customer, lines, total_cents)
    ),
    reply_to: None,
  }
}

pub fn operator_new_order(
  operator: &str,
  order_id: i64,
  customer: &CustomerInfo,
  lines: &[EmailLine],
  total_cents: i64,
) -> EmailMessage {
  EmailMessage {
    to: operator.to_string(),
    subject: format!("YENİ SİPARİŞ #{} - {}", order_id, customer.full_name()),
    html_body: format!("<p>Yeni sipariş alındı!</p>{}", order_body(order_id, customer, lines, total_cents)),
    reply_to: Some(customer.email.clone()).filter(|e| !e.is_empty()),
  }
}

pub fn order_cancelled(order_id: i64, to: &str, customer_name: &str) -> EmailMessage {
  EmailMessage {
    to: to.to_string(),
    subject: format!("Siparişiniz İptal Edildi - #{}", order_id),
    html_body: format!(
      "<p>Merhaba {},</p><p>#{} numaralı siparişiniz iptal edilmiştir.</p>\
       <p>Sorularınız için bizimle iletişime geçebilirsiniz.</p>",
      escape(customer_name),
      order_id
    ),
    reply_to: None,
  }
}

pub fn welcome(to: &str, first_name: &str) -> EmailMessage {
  EmailMessage {
    to: to.to_string(),
    subject: "Hoş geldiniz!".to_string(),
    html_body: format!(
      "<p>Merhaba {},</p><p>Hesabınız oluşturuldu. Afiyet olsun!</p>",
      escape(first_name)
    ),
    reply_to: None,
  }
}

pub fn maintenance_notice(to: &str, table_name: &str) -> EmailMessage {
  EmailMessage {
    to: to.to_string(),
    subject: "Sistem Bakım Bildirimi".to_string(),
    html_body: format!(
      "<p>Sistemimizde bakım çalışması yapılmıştır ({}).</p><p>Anlayışınız için teşekkür ederiz.</p>",
      escape(table_name)
    ),
    reply_to: None,
  }
}
