//! Range snapshot example - picks a message range in a chat snapshot and prints it

use rangeshot::page::{ChatPage, HtmlPage};
use rangeshot::{SelectionEvent, SelectionRange};

const CHAT: &str = r#"<html><body><div id="chat">
  <div class="mes" data-rect="0 0 380 60">Hello there</div>
  <div class="mes" data-rect="0 65 380 40">How is the build going?</div>
  <div class="mes" data-rect="0 110 380 80">Green on every platform.</div>
  <div class="mes" data-rect="0 195 380 30">Ship it</div>
</div></body></html>"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Rangeshot - Range Snapshot Example\n");

    let page = HtmlPage::parse("https://chat.example/", CHAT);
    let messages = page.query_selector_all(".mes");

    // Pick the end before the start; the range comes out in document order
    let mut range = SelectionRange::new();
    range.apply(SelectionEvent::SetEnd);
    range.apply(SelectionEvent::MessageClicked(messages[1]));
    range.apply(SelectionEvent::SetStart);
    range.apply(SelectionEvent::MessageClicked(messages[2]));

    let picked = range.resolve(&messages);
    if picked.is_empty() {
        return Err("range did not resolve".into());
    }

    let mut height = 0.0_f64;
    for node in &picked {
        let rect = page.bounding_rect(*node);
        height += rect.height;
        println!("{:>6.1}px  {}", rect.height, page.text_content(*node).trim());
    }
    println!("{}", "-".repeat(40));
    println!("{} messages, {:.1}px of content", picked.len(), height);

    Ok(())
}
