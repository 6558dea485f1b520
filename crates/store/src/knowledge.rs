//! Static support texts served by the knowledge tools.

use async_trait::async_trait;
use hydra_core::catalog::{KnowledgeBase, KnowledgeTopic};
use hydra_core::error::StoreError;

const APP_PURPOSE: &str = "\
App Purpose: Arctic Store

Arctic Store is the online shop for Arctic hydration products: premium water bottles and hydration gear.
Customers browse the catalog, place and track orders, and keep a hydration profile (activity level,
climate, goals). Hydra, the built-in support assistant, answers questions about products, orders,
shipping, returns and the company, and gives personalised hydration advice to logged-in users.";

const BOT_DOCUMENTATION: &str = "\
Hydra: how the assistant works

Flow:
- Each message is answered by a bounded tool-calling loop. The model may call tools (order lookup,
  product search, policies, profile) up to 5 rounds before it must answer.
- Tools of one round run concurrently. Failures are returned to the model as structured errors so it
  can recover or ask a clarifying question.
- The final reply is a JSON object validated before it reaches you: an `answer` with up to 6 embedded
  product/order cards, or an `ambiguity` listing up to 4 candidates to choose from.

Tools: getOrderById, getProductById, listAllOrders, listAllProducts, getProductCatalog, searchProducts,
getAppPurpose, getBotDocumentation, getCompanyInformation, getShippingPolicy,
getReturnsAndRefundsPolicy, getUserProfile, updateUserProfile.

Identity: profile tools only ever act on the logged-in user. Without a login, personalised advice is
unavailable but everything else works.

Limits: chat requests are rate limited per user (10 per minute). Only the last 10 messages of a
conversation are used as context.

API: POST /v1/chat, GET /v1/conversations, GET /v1/conversations/{id}/messages, GET /v1/tools, GET /health.";

const COMPANY_INFORMATION: &str = "\
Company Information: Arctic (India)
Arctic is an India-based spring water brand focused on still, sparkling, and infused water products with
balanced minerals and clean taste.

What we make:
- Still and sparkling spring water, lightly infused variants, mineral-balanced electrolyte blends
- Premium reusable bottles sold through the Arctic Store

Sourcing & quality:
- Each batch is tested for purity, mineral profile, and contaminants.
- BPA-free, recyclable packaging; compliant with applicable BIS/FSSAI norms.

Support:
- Email: support@arcticwater.com
- Hours: Mon - Fri, 9:00 AM - 6:00 PM IST
- Typical first response time: within 1 business day.

Terms (summary):
- Deliveries are limited to serviceable India PIN codes.
- Payment: major cards, UPI, net banking, and COD where available.
- Title passes on delivery; report damage within 72 hours.
- Returns and refunds follow the Returns & Refunds Policy.";

const SHIPPING_POLICY: &str = "\
Shipping Policy: Arctic (India)

Processing: orders ship within 1 to 2 business days (Mon to Sat); same-day cutoff 2:00 PM IST.

Timelines:
- Metro to metro: 2 to 4 business days.
- Metro to non-metro: 3 to 6 business days.
- Remote PIN codes: 5 to 10 business days.
- India-only delivery; no international shipping.

Rates: orders of ₹1,500 or more ship free (standard). Below that, shipping is calculated at checkout.

Cash on delivery: available on select PIN codes; repeated refusals may disable COD.

Delivery attempts: 2 to 3 depending on carrier, after which the shipment returns to origin.

Tracking: sent by email/SMS when the label is created; scans can take up to 12 hours to appear.

Damaged, leaking, or missing items: photograph the box, packaging and labels within 72 hours of
delivery and contact support@arcticwater.com. We will reship or refund.";

const RETURNS_POLICY: &str = "\
Returns & Refunds Policy: Arctic (India)

Return window:
- Unopened products: 30 days from delivery.
- Opened or partially used bottles: not eligible for food-safety reasons.
- Promotional/limited editions: final sale unless damaged on arrival.

How to return: email support@arcticwater.com with the order ID, items, reason, and photos if damaged.
We issue an RMA with instructions. Unauthorized returns may be refused.

Refunds: processed after inspection, typically 5 to 7 business days to cards/UPI. COD orders are
refunded by UPI/bank transfer. Shipping fees are refunded only if we erred or the item was damaged.

Exchanges: return (if eligible) and place a new order.

Return shipping: free when the item was defective or we made a mistake; otherwise paid by the customer.";

/// Knowledge base backed by compiled-in texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticKnowledge;

impl StaticKnowledge {
    pub fn text(topic: KnowledgeTopic) -> &'static str {
        match topic {
            KnowledgeTopic::AppPurpose => APP_PURPOSE,
            KnowledgeTopic::BotDocumentation => BOT_DOCUMENTATION,
            KnowledgeTopic::CompanyInformation => COMPANY_INFORMATION,
            KnowledgeTopic::ShippingPolicy => SHIPPING_POLICY,
            KnowledgeTopic::ReturnsAndRefundsPolicy => RETURNS_POLICY,
        }
    }
}

#[async_trait]
impl KnowledgeBase for StaticKnowledge {
    async fn fetch(&self, topic: KnowledgeTopic) -> Result<String, StoreError> {
        Ok(Self::text(topic).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_topic_has_text() {
        let kb = StaticKnowledge;
        for topic in [
            KnowledgeTopic::AppPurpose,
            KnowledgeTopic::BotDocumentation,
            KnowledgeTopic::CompanyInformation,
            KnowledgeTopic::ShippingPolicy,
            KnowledgeTopic::ReturnsAndRefundsPolicy,
        ] {
            assert!(!kb.fetch(topic).await.unwrap().is_empty());
        }
    }

    #[test]
    fn support_email_is_consistent() {
        assert!(StaticKnowledge::text(KnowledgeTopic::CompanyInformation).contains("support@arcticwater.com"));
        assert!(StaticKnowledge::text(KnowledgeTopic::ReturnsAndRefundsPolicy).contains("support@arcticwater.com"));
    }
}
