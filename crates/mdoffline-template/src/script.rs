//! Inline document script.
//!
//! Plain ES5 fragments, each included only when the document needs it, joined
//! into one IIFE. Nothing here fetches from the network.

use mdoffline_config::TocMode;
use mdoffline_renderer::AssetManifest;

const THEME_TOGGLE: &str = r"
  var root = document.documentElement;
  var themeBtn = document.getElementById('themeToggle');
  if (themeBtn) {
    var setTheme = function(t){
      root.setAttribute('data-theme', t);
      themeBtn.setAttribute('aria-pressed', t === 'dark' ? 'true' : 'false');
      try { localStorage.setItem('mdoffline-theme', t); } catch (e) {}
    };
    var saved = null;
    try { saved = localStorage.getItem('mdoffline-theme'); } catch (e) {}
    setTheme(saved === 'dark' ? 'dark' : 'light');
    themeBtn.addEventListener('click', function(){
      setTheme(root.getAttribute('data-theme') === 'dark' ? 'light' : 'dark');
    });
  }
";

const SIDEBAR: &str = r"
  var sidebar = document.getElementById('toc-sidebar');
  var backdrop = document.getElementById('toc-backdrop');
  var openBtn = document.getElementById('tocSidebarToggle');
  var closeBtn = document.getElementById('tocSidebarClose');
  if (sidebar && backdrop && openBtn) {
    var setOpen = function(open){
      sidebar.classList.toggle('open', open);
      sidebar.classList.toggle('closed', !open);
      sidebar.setAttribute('aria-hidden', open ? 'false' : 'true');
      openBtn.setAttribute('aria-pressed', open ? 'true' : 'false');
      backdrop.classList.toggle('hidden', !open);
    };
    openBtn.addEventListener('click', function(){ setOpen(!sidebar.classList.contains('open')); });
    if (closeBtn) closeBtn.addEventListener('click', function(){ setOpen(false); });
    backdrop.addEventListener('click', function(){ setOpen(false); });
    sidebar.addEventListener('click', function(e){ if (e.target.tagName === 'A') setOpen(false); });
    document.addEventListener('keydown', function(e){
      if (e.key === 'Escape' && sidebar.classList.contains('open')) setOpen(false);
    });
  }
";

const COLLAPSIBLE: &str = r"
  Array.prototype.forEach.call(document.querySelectorAll('.collapsible'), function(h){
    var toggle = function(){
      var collapsed = h.classList.toggle('collapsed');
      h.setAttribute('aria-expanded', collapsed ? 'false' : 'true');
    };
    h.addEventListener('click', function(e){ if (!e.target.closest('.heading-anchor')) toggle(); });
    h.addEventListener('keydown', function(e){
      if (e.key === 'Enter' || e.key === ' ') { e.preventDefault(); toggle(); }
    });
  });
  var expandTarget = function(){
    var id = decodeURIComponent(location.hash.slice(1));
    var el = id && document.getElementById(id);
    while (el && el !== document.body) {
      if (el.classList.contains('section-body')) {
        var head = el.previousElementSibling;
        if (head && head.classList.contains('collapsed')) {
          head.classList.remove('collapsed');
          head.setAttribute('aria-expanded', 'true');
        }
      }
      el = el.parentElement;
    }
  };
  window.addEventListener('hashchange', expandTarget);
  expandTarget();
";

const SEARCH: &str = r"
  var searchBox = document.getElementById('searchBox');
  var searchCount = document.getElementById('searchCount');
  var searchClear = document.getElementById('searchClear');
  var clearMarks = function(){
    Array.prototype.forEach.call(article.querySelectorAll('mark.hl'), function(m){
      var parent = m.parentNode;
      while (m.firstChild) parent.insertBefore(m.firstChild, m);
      parent.removeChild(m);
    });
    article.normalize();
  };
  var highlight = function(q){
    clearMarks();
    if (!q || q.length < 2) { searchCount.textContent = ''; return; }
    var needle = q.toLowerCase();
    var total = 0;
    var walk = function(node){
      if (node.nodeType === 1) {
        if (/^(SCRIPT|STYLE|CODE|PRE)$/.test(node.tagName) || node.classList.contains('katex')) return;
        Array.prototype.slice.call(node.childNodes).forEach(walk);
      } else if (node.nodeType === 3) {
        var text = node.nodeValue;
        var lower = text.toLowerCase();
        var idx = lower.indexOf(needle);
        if (idx === -1) return;
        var frag = document.createDocumentFragment();
        var last = 0;
        while (idx !== -1) {
          frag.appendChild(document.createTextNode(text.slice(last, idx)));
          var mark = document.createElement('mark');
          mark.className = 'hl';
          mark.textContent = text.slice(idx, idx + q.length);
          frag.appendChild(mark);
          total++;
          last = idx + q.length;
          idx = lower.indexOf(needle, last);
        }
        frag.appendChild(document.createTextNode(text.slice(last)));
        node.parentNode.replaceChild(frag, node);
      }
    };
    walk(article);
    searchCount.textContent = total ? total + (total === 1 ? ' match' : ' matches') : 'No matches';
    var first = article.querySelector('mark.hl');
    if (first) first.scrollIntoView({ block: 'center' });
  };
  if (searchBox) {
    searchBox.addEventListener('input', function(){ highlight(searchBox.value.trim()); });
    searchClear.addEventListener('click', function(){
      searchBox.value = '';
      highlight('');
    });
  }
";

const COPY_BUTTONS: &str = r"
  var copyText = function(text, btn){
    var done = function(label){
      btn.textContent = label;
      btn.classList.toggle('copied', label === 'Copied!');
      setTimeout(function(){ btn.textContent = btn.getAttribute('data-label'); btn.classList.remove('copied'); }, 2000);
    };
    if (navigator.clipboard && navigator.clipboard.writeText) {
      navigator.clipboard.writeText(text).then(function(){ done('Copied!'); }, function(){ done('Error'); });
      return;
    }
    var area = document.createElement('textarea');
    area.value = text;
    area.style.position = 'fixed';
    area.style.opacity = '0';
    document.body.appendChild(area);
    area.select();
    try { document.execCommand('copy'); done('Copied!'); } catch (e) { done('Error'); }
    document.body.removeChild(area);
  };
  Array.prototype.forEach.call(article.querySelectorAll('pre > code'), function(code){
    var btn = document.createElement('button');
    btn.type = 'button';
    btn.className = 'copy-btn';
    btn.textContent = 'Copy';
    btn.setAttribute('data-label', 'Copy');
    btn.setAttribute('aria-label', 'Copy code to clipboard');
    btn.addEventListener('click', function(){
      var clone = code.cloneNode(true);
      var rows = clone.querySelector('.line-numbers-rows');
      if (rows) rows.parentNode.removeChild(rows);
      copyText(clone.textContent, btn);
    });
    code.parentNode.appendChild(btn);
  });
";

const COPY_SOURCE: &str = r"
  var sourceBtn = document.getElementById('copyMarkdown');
  var sourceEl = document.getElementById('md-source');
  if (sourceBtn && sourceEl) {
    sourceBtn.setAttribute('data-label', sourceBtn.textContent);
    sourceBtn.addEventListener('click', function(){
      copyText(JSON.parse(sourceEl.textContent), sourceBtn);
    });
  }
";

const KATEX: &str = r"
  if (window.katex) {
    Array.prototype.forEach.call(article.querySelectorAll('span.math'), function(span){
      var display = span.classList.contains('math-display');
      try {
        window.katex.render(span.textContent, span, { displayMode: display, throwOnError: false });
      } catch (e) {
        span.title = String(e);
      }
    });
  }
";

/// Build the inline script for a document.
///
/// `katex` tells whether the KaTeX library is embedded; math spans stay as
/// TeX source without it.
pub(crate) fn script(manifest: &AssetManifest, theme_toggle: bool, katex: bool) -> String {
    let mut js = String::with_capacity(8192);
    js.push_str("(function(){\n  'use strict';\n  var article = document.getElementById('content');\n");
    if theme_toggle {
        js.push_str(THEME_TOGGLE);
    }
    if manifest.toc_mode == TocMode::Sidebar {
        js.push_str(SIDEBAR);
    }
    if manifest.collapsible {
        js.push_str(COLLAPSIBLE);
    }
    if manifest.search {
        js.push_str(SEARCH);
    }
    js.push_str(COPY_BUTTONS);
    if manifest.embed_source {
        js.push_str(COPY_SOURCE);
    }
    if manifest.katex && katex {
        js.push_str(KATEX);
    }
    js.push_str("})();\n");
    js
}
